//! Spreadsheet export of tabular replies.

use crate::error::ChatError;
use crate::interpreter::{columns, DownloadPlan};
use crate::state::Record;
use rust_xlsxwriter::{Format, Workbook};
use serde_json::Value;
use std::time::Duration;
use wasm_bindgen::{JsCast, JsValue};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const REVOKE_DELAY: Duration = Duration::from_secs(40);

fn js_err(value: JsValue) -> ChatError {
    ChatError::Export(format!("{value:?}"))
}

/// Encodes `records` as a single-sheet workbook. The header row follows the
/// first record's key order; keys missing from later rows stay blank.
pub fn build_workbook(records: &[Record], sheet: &str) -> Result<Vec<u8>, ChatError> {
    if records.is_empty() {
        return Err(ChatError::NoDataToExport);
    }
    let header = columns(records);
    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;

    for (col, name) in header.iter().enumerate() {
        let col = u16::try_from(col).map_err(|e| ChatError::Export(e.to_string()))?;
        worksheet.write_string_with_format(0, col, name, &bold)?;
    }
    for (row, record) in records.iter().enumerate() {
        let row = u32::try_from(row + 1).map_err(|e| ChatError::Export(e.to_string()))?;
        for (col, name) in header.iter().enumerate() {
            let col = u16::try_from(col).map_err(|e| ChatError::Export(e.to_string()))?;
            match record.get(name) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(n) => {
                        worksheet.write_number(row, col, n)?;
                    }
                    None => {
                        worksheet.write_string(row, col, n.to_string())?;
                    }
                },
                Some(Value::String(s)) => {
                    worksheet.write_string(row, col, s)?;
                }
                Some(other) => {
                    worksheet.write_string(row, col, other.to_string())?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

/// Hands `bytes` to the browser as a file download.
pub fn save_bytes(bytes: &[u8], filename: &str) -> Result<(), ChatError> {
    let array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&array);
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(XLSX_MIME);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
        .map_err(js_err)?;
    let href = web_sys::Url::create_object_url_with_blob(&blob).map_err(js_err)?;
    let anchor: web_sys::HtmlAnchorElement = leptos::document()
        .create_element("a")
        .map_err(js_err)?
        .dyn_into()
        .map_err(|_| ChatError::Export("not an anchor element".to_string()))?;
    anchor.set_href(&href);
    anchor.set_download(filename);
    let body = leptos::document()
        .body()
        .ok_or_else(|| ChatError::Export("document has no body".to_string()))?;
    body.append_child(&anchor).map_err(js_err)?;
    anchor.click();
    anchor.remove();
    // The browser reads the blob after click() returns.
    leptos::set_timeout(
        move || {
            if let Err(err) = web_sys::Url::revoke_object_url(&href) {
                leptos::logging::warn!("Could not revoke {href}: {err:?}");
            }
        },
        REVOKE_DELAY,
    );
    Ok(())
}

pub fn export_table(records: &[Record], filename: &str, sheet: &str) -> Result<(), ChatError> {
    let bytes = build_workbook(records, sheet)?;
    save_bytes(&bytes, filename)
}

async fn fetch_remote(url: &str) -> Result<Vec<u8>, ChatError> {
    let res = reqwest::get(url).await?.error_for_status()?;
    Ok(res.bytes().await?.to_vec())
}

/// Runs a download plan; returns the saved file name.
pub async fn run_plan(plan: DownloadPlan) -> Result<String, ChatError> {
    match plan {
        DownloadPlan::Remote { url, filename } => {
            let bytes = fetch_remote(&url)
                .await
                .map_err(|err| ChatError::Export(err.to_string()))?;
            save_bytes(&bytes, &filename)?;
            Ok(filename)
        }
        DownloadPlan::Local {
            records,
            filename,
            sheet,
        } => {
            export_table(&records, &filename, &sheet)?;
            Ok(filename)
        }
    }
}
