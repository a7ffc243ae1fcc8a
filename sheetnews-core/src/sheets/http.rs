//! Google Sheets API v4 over blocking HTTPS

use super::auth::TokenSource;
use super::{FormatRequest, GridRange, SheetsBackend, SheetsError, TabHandle};
use crate::table::{CellValue, Grid};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Marker the API puts in the error message of an empty `batchUpdate`
const EMPTY_BATCH_MESSAGE: &str = "at least one request";

/// Sheets API client bound to one spreadsheet
pub struct GoogleSheetsClient {
    http: Client,
    base_url: Url,
    spreadsheet_id: String,
    tokens: Box<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl From<SheetProperties> for TabHandle {
    fn from(p: SheetProperties) -> Self {
        TabHandle {
            sheet_id: p.sheet_id,
            title: p.title,
            row_count: p.grid_properties.row_count,
            column_count: p.grid_properties.column_count,
        }
    }
}

impl GoogleSheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, tokens: Box<dyn TokenSource>) -> Result<Self, SheetsError> {
        let base_url = Url::parse(DEFAULT_BASE_URL).map_err(|e| SheetsError::Api {
            status: 0,
            message: format!("invalid base URL: {}", e),
        })?;
        Ok(Self {
            http: Client::builder().build()?,
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        })
    }

    /// Spreadsheet URL with extra path segments appended (percent-encoded)
    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::Api {
                status: 0,
                message: format!("base URL cannot take a path: {}", self.base_url),
            })?
            .extend(segments);
        Ok(url)
    }

    fn send(&mut self, request: RequestBuilder) -> Result<Value, SheetsError> {
        let token = self.tokens.access_token()?;
        let response = request.bearer_auth(token).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn list_tabs(&mut self) -> Result<Vec<TabHandle>, SheetsError> {
        let mut url = self.url(&[self.spreadsheet_id.as_str()])?;
        url.query_pairs_mut().append_pair(
            "fields",
            "sheets.properties(sheetId,title,gridProperties(rowCount,columnCount))",
        );
        debug!("GET spreadsheet metadata");
        let request = self.http.get(url);
        let body = self.send(request)?;
        let meta: SpreadsheetMeta = serde_json::from_value(body)?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.into()).collect())
    }

    fn batch_update(&mut self, requests: Vec<Value>) -> Result<Value, SheetsError> {
        if requests.is_empty() {
            return Err(SheetsError::EmptyBatch);
        }
        let url = self.url(&[format!("{}:batchUpdate", self.spreadsheet_id).as_str()])?;
        debug!("POST batchUpdate with {} requests", requests.len());
        let request = self.http.post(url).json(&json!({ "requests": requests }));
        self.send(request)
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SheetsError> {
        let range = format!("{}{}", range, suffix);
        self.url(&[self.spreadsheet_id.as_str(), "values", range.as_str()])
    }
}

impl SheetsBackend for GoogleSheetsClient {
    fn find_tab(&mut self, title: &str) -> Result<Option<TabHandle>, SheetsError> {
        Ok(self.list_tabs()?.into_iter().find(|t| t.title == title))
    }

    fn add_tab(&mut self, title: &str, rows: u32, columns: u32) -> Result<TabHandle, SheetsError> {
        let reply = self.batch_update(vec![json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": columns }
                }
            }
        })])?;
        let properties = reply
            .pointer("/replies/0/addSheet/properties")
            .cloned()
            .ok_or_else(|| SheetsError::Api {
                status: 200,
                message: "addSheet reply carries no sheet properties".to_string(),
            })?;
        let properties: SheetProperties = serde_json::from_value(properties)?;
        Ok(properties.into())
    }

    fn read_values(&mut self, tab: &TabHandle) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(&quote_title(&tab.title), "")?;
        debug!("GET values of '{}'", tab.title);
        let request = self.http.get(url);
        let body = self.send(request)?;
        Ok(value_rows(serde_json::from_value(body)?))
    }

    fn header_row(&mut self, tab: &TabHandle) -> Result<Vec<String>, SheetsError> {
        let url = self.values_url(&format!("{}!1:1", quote_title(&tab.title)), "")?;
        let request = self.http.get(url);
        let body = self.send(request)?;
        Ok(value_rows(serde_json::from_value(body)?)
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    fn replace_contents(&mut self, tab: &TabHandle, grid: &Grid) -> Result<(), SheetsError> {
        let height = grid.height() as u32;
        let width = grid.width() as u32;
        if height > tab.row_count || width > tab.column_count {
            debug!("Growing '{}' to fit {}x{}", tab.title, height, width);
            self.batch_update(vec![json!({
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": tab.sheet_id,
                        "gridProperties": {
                            "rowCount": height.max(tab.row_count),
                            "columnCount": width.max(tab.column_count)
                        }
                    },
                    "fields": "gridProperties.rowCount,gridProperties.columnCount"
                }
            })])?;
        }

        let range = quote_title(&tab.title);
        debug!("Clearing '{}'", tab.title);
        let url = self.values_url(&range, ":clear")?;
        let request = self.http.post(url).json(&json!({}));
        self.send(request)?;

        let target = format!("{}!A1", range);
        let mut url = self.values_url(&target, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let values: Vec<Vec<Value>> = grid
            .to_values()
            .iter()
            .map(|row| row.iter().map(cell_json).collect())
            .collect();
        debug!("Writing {} rows to '{}'", values.len(), tab.title);
        let request = self.http.put(url).json(&json!({
            "range": target,
            "majorDimension": "ROWS",
            "values": values,
        }));
        self.send(request)?;
        Ok(())
    }

    fn apply_formatting(
        &mut self,
        tab: &TabHandle,
        requests: &[FormatRequest],
    ) -> Result<(), SheetsError> {
        let body = requests
            .iter()
            .map(|r| request_json(r, tab.sheet_id))
            .collect();
        self.batch_update(body)?;
        Ok(())
    }
}

/// Quote a tab title for use in A1 notation
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn value_rows(range: ValueRange) -> Vec<Vec<String>> {
    range
        .values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

fn cell_json(value: &CellValue) -> Value {
    match value {
        CellValue::Empty => json!(""),
        CellValue::Number(n) => json!(n),
        CellValue::Text(t) => json!(t),
    }
}

/// Map an unsuccessful response to an error, recognising empty batches
fn api_error(status: u16, body: &str) -> SheetsError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == 400 && message.to_lowercase().contains(EMPTY_BATCH_MESSAGE) {
        return SheetsError::EmptyBatch;
    }
    if status == 401 {
        return SheetsError::Auth(message);
    }
    SheetsError::Api { status, message }
}

fn grid_range_json(range: &GridRange, sheet_id: i64) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("sheetId".to_string(), json!(sheet_id));
    for (key, bound) in [
        ("startRowIndex", range.start_row),
        ("endRowIndex", range.end_row),
        ("startColumnIndex", range.start_col),
        ("endColumnIndex", range.end_col),
    ] {
        if let Some(v) = bound {
            obj.insert(key.to_string(), json!(v));
        }
    }
    Value::Object(obj)
}

fn column_span_json(sheet_id: i64, start: u32, end: u32) -> Value {
    json!({
        "sheetId": sheet_id,
        "dimension": "COLUMNS",
        "startIndex": start,
        "endIndex": end,
    })
}

fn repeat_cell_json(range: &GridRange, sheet_id: i64, format: Value, fields: &str) -> Value {
    json!({
        "repeatCell": {
            "range": grid_range_json(range, sheet_id),
            "cell": { "userEnteredFormat": format },
            "fields": fields,
        }
    })
}

/// `batchUpdate` request body for one formatting operation
fn request_json(request: &FormatRequest, sheet_id: i64) -> Value {
    match request {
        FormatRequest::FreezeRows(rows) => json!({
            "updateSheetProperties": {
                "properties": {
                    "sheetId": sheet_id,
                    "gridProperties": { "frozenRowCount": rows }
                },
                "fields": "gridProperties.frozenRowCount"
            }
        }),
        FormatRequest::Bold(range) => repeat_cell_json(
            range,
            sheet_id,
            json!({ "textFormat": { "bold": true } }),
            "userEnteredFormat.textFormat.bold",
        ),
        FormatRequest::Wrap(range, strategy) => repeat_cell_json(
            range,
            sheet_id,
            json!({ "wrapStrategy": strategy }),
            "userEnteredFormat.wrapStrategy",
        ),
        FormatRequest::Background(range, color) => repeat_cell_json(
            range,
            sheet_id,
            json!({ "backgroundColor": color }),
            "userEnteredFormat.backgroundColor",
        ),
        FormatRequest::ColumnWidth { column, pixels } => json!({
            "updateDimensionProperties": {
                "range": column_span_json(sheet_id, *column, column + 1),
                "properties": { "pixelSize": pixels },
                "fields": "pixelSize"
            }
        }),
        FormatRequest::DeleteColumns { start, end } => json!({
            "deleteDimension": { "range": column_span_json(sheet_id, *start, *end) }
        }),
        FormatRequest::ShowColumns { start, end } => json!({
            "updateDimensionProperties": {
                "range": column_span_json(sheet_id, *start, *end),
                "properties": { "hiddenByUser": false },
                "fields": "hiddenByUser"
            }
        }),
        FormatRequest::HideColumns { start, end } => json!({
            "updateDimensionProperties": {
                "range": column_span_json(sheet_id, *start, *end),
                "properties": { "hiddenByUser": true },
                "fields": "hiddenByUser"
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;
    use crate::sheets::WrapStrategy;

    #[test]
    fn test_empty_batch_error_is_recognised() {
        let body = r#"{"error":{"code":400,"message":"Invalid requests: Must specify at least one request.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(api_error(400, body), SheetsError::EmptyBatch));

        let other = r#"{"error":{"code":400,"message":"Unable to parse range","status":"INVALID_ARGUMENT"}}"#;
        match api_error(400, other) {
            SheetsError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Unable to parse range");
            }
            e => panic!("unexpected error: {e:?}"),
        }

        assert!(matches!(api_error(401, "nope"), SheetsError::Auth(_)));
        assert!(matches!(
            api_error(503, "<html>"),
            SheetsError::Api { status: 503, ref message } if message == "<html>"
        ));
    }

    #[test]
    fn test_background_request() {
        let req = FormatRequest::Background(
            GridRange::bounded(1, 3, 0, 3),
            Color::new(0.5, 0.25, 1.0),
        );
        let body = request_json(&req, 7);
        let repeat = &body["repeatCell"];
        assert_eq!(repeat["range"]["sheetId"], 7);
        assert_eq!(repeat["range"]["startRowIndex"], 1);
        assert_eq!(repeat["range"]["endRowIndex"], 3);
        assert_eq!(repeat["range"]["endColumnIndex"], 3);
        assert_eq!(repeat["cell"]["userEnteredFormat"]["backgroundColor"]["red"], 0.5);
        assert_eq!(repeat["fields"], "userEnteredFormat.backgroundColor");
    }

    #[test]
    fn test_unbounded_rows_are_omitted() {
        let req = FormatRequest::Wrap(GridRange::columns(0, 10), WrapStrategy::OverflowCell);
        let body = request_json(&req, 0);
        let range = body["repeatCell"]["range"].as_object().unwrap();
        assert!(!range.contains_key("startRowIndex"));
        assert!(!range.contains_key("endRowIndex"));
        assert_eq!(
            body["repeatCell"]["cell"]["userEnteredFormat"]["wrapStrategy"],
            "OVERFLOW_CELL"
        );
    }

    #[test]
    fn test_dimension_requests() {
        let width = request_json(&FormatRequest::ColumnWidth { column: 1, pixels: 1700 }, 3);
        assert_eq!(width["updateDimensionProperties"]["range"]["startIndex"], 1);
        assert_eq!(width["updateDimensionProperties"]["range"]["endIndex"], 2);
        assert_eq!(width["updateDimensionProperties"]["properties"]["pixelSize"], 1700);

        let delete = request_json(&FormatRequest::DeleteColumns { start: 3, end: 5 }, 3);
        assert_eq!(delete["deleteDimension"]["range"]["dimension"], "COLUMNS");

        let hide = request_json(&FormatRequest::HideColumns { start: 3, end: 10 }, 3);
        assert_eq!(hide["updateDimensionProperties"]["properties"]["hiddenByUser"], true);

        let freeze = request_json(&FormatRequest::FreezeRows(1), 3);
        assert_eq!(
            freeze["updateSheetProperties"]["properties"]["gridProperties"]["frozenRowCount"],
            1
        );
    }

    #[test]
    fn test_quote_title_and_values() {
        assert_eq!(quote_title("UC"), "'UC'");
        assert_eq!(quote_title("Bob's"), "'Bob''s'");

        let range: ValueRange =
            serde_json::from_str(r#"{"range":"'UC'!A1:C2","values":[["a", 1],["b"]]}"#).unwrap();
        assert_eq!(
            value_rows(range),
            vec![vec!["a".to_string(), "1".to_string()], vec!["b".to_string()]]
        );

        let empty: ValueRange = serde_json::from_str(r#"{"range":"'UC'!A1:Z1000"}"#).unwrap();
        assert!(value_rows(empty).is_empty());
    }
}
