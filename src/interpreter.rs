//! Turns free-text bot replies into renderable content.
//!
//! The bot answers with human-readable text. Order listings, pincode rankings
//! and report links follow a handful of fixed line shapes, which are picked
//! up here by an ordered table of classifiers. Supporting a new reply shape
//! means adding a row to [`CLASSIFIERS`] or [`GRAMMARS`].

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::state::{Message, Record};
use regex::Regex;
use serde_json::Value;
use std::ops::Range;
use std::sync::LazyLock;

pub const EXPORT_FILENAME: &str = "exported_data.xlsx";
pub const EXPORT_SHEET: &str = "Data";

/// Lowercase phrases marking a reply that has something to download.
pub const TRIGGER_PHRASES: &[&str] = &[
    "pincode:",
    "- order id:",
    "pending orders",
    "delivered orders",
    "orders report",
    "delivery summary",
    ".xlsx",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    PlainText(String),
    Table(Table),
    Link(Link),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub records: Vec<Record>,
    pub filename: &'static str,
    pub sheet: &'static str,
    /// Reply lines above the first table line.
    pub lead: String,
    /// Remaining reply lines that are not part of the table.
    pub trail: String,
}

impl Table {
    pub fn columns(&self) -> Vec<String> {
        columns(&self.records)
    }
}

/// Column names in the first record's key order.
pub fn columns(records: &[Record]) -> Vec<String> {
    records
        .first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Image,
    Spreadsheet,
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub label: String,
    pub url: String,
    pub kind: LinkKind,
    /// The reply text with the link markup removed.
    pub context: String,
}

impl Link {
    pub fn forced_download(&self) -> bool {
        self.kind == LinkKind::Spreadsheet
    }

    /// Last path segment of the URL, used as the saved file name.
    pub fn filename(&self) -> String {
        filename_of(&self.url)
    }
}

pub fn filename_of(link: &str) -> String {
    let from_url = url::Url::parse(link).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_owned))
    });
    let name = from_url.unwrap_or_else(|| {
        let path = link.split(['?', '#']).next().unwrap_or(link);
        path.rsplit('/').next().unwrap_or(path).to_string()
    });
    if name.is_empty() {
        EXPORT_FILENAME.to_string()
    } else {
        name
    }
}

#[derive(Clone, Copy)]
enum Field {
    Text,
    Integer,
}

/// A fixed line shape: one regex capture group per field.
struct Grammar {
    pattern: &'static str,
    fields: &'static [(&'static str, Field)],
    filename: &'static str,
    sheet: &'static str,
}

const ORDERS_FILE: &str = "pending_orders.xlsx";
const ORDERS_SHEET: &str = "Orders";

const GRAMMARS: &[Grammar] = &[
    Grammar {
        pattern: r"Pincode:\s*(\d+)\s*→\s*(\d+)\s*orders",
        fields: &[("Pincode", Field::Text), ("Orders", Field::Integer)],
        filename: "top_pincodes.xlsx",
        sheet: "Pincodes",
    },
    Grammar {
        pattern: r"- Order ID:([^|\n]+)\|\s*Customer:([^|\n]+)\|\s*Status:([^|\n]+)\|\s*To:([^|\n]+)\|\s*Created:([^|\n]+)",
        fields: &[
            ("Order ID", Field::Text),
            ("Customer", Field::Text),
            ("Status", Field::Text),
            ("To", Field::Text),
            ("Created", Field::Text),
        ],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
    Grammar {
        pattern: r"- Order ID:([^|\n]+)\|\s*Status:([^|\n]+)\|\s*To:([^|\n]+)\|\s*Created:([^|\n]+)",
        fields: &[
            ("Order ID", Field::Text),
            ("Status", Field::Text),
            ("To", Field::Text),
            ("Created", Field::Text),
        ],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
    Grammar {
        pattern: r"- Order ID:([^|\n]+)\|\s*Customer:([^|\n]+)\|\s*Status:([^|\n]+)\|\s*Date:([^|\n]+)",
        fields: &[
            ("Order ID", Field::Text),
            ("Customer", Field::Text),
            ("Status", Field::Text),
            ("Date", Field::Text),
        ],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
    Grammar {
        pattern: r"- Order ID:([^|\n]+)\|\s*Status:([^|\n]+)\|\s*Date:([^|\n]+)\|\s*Customer:([^|\n]+)",
        fields: &[
            ("Order ID", Field::Text),
            ("Status", Field::Text),
            ("Date", Field::Text),
            ("Customer", Field::Text),
        ],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
    Grammar {
        pattern: r"- Order ID:([^|\n]+)\|\s*Status:([^|\n]+)\|\s*Created At:([^|\n]+)",
        fields: &[
            ("Order ID", Field::Text),
            ("Status", Field::Text),
            ("Created At", Field::Text),
        ],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
    Grammar {
        pattern: r"- Order ID:([^|\n]+)\|\s*Customer:([^|\n]+)\|\s*Agent:([^|\n]+)",
        fields: &[
            ("Order ID", Field::Text),
            ("Customer", Field::Text),
            ("Agent", Field::Text),
        ],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
    Grammar {
        pattern: r"(?m)- Order ID:([^|\n]+)\|\s*Status:([^|\n]+)$",
        fields: &[("Order ID", Field::Text), ("Status", Field::Text)],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
    Grammar {
        pattern: r"- Order ID:([^|\n]+)\|([^|\n→]+)→([^|\n]+)",
        fields: &[
            ("Order ID", Field::Text),
            ("From", Field::Text),
            ("To", Field::Text),
        ],
        filename: ORDERS_FILE,
        sheet: ORDERS_SHEET,
    },
];

static COMPILED: LazyLock<Vec<(Regex, &'static Grammar)>> = LazyLock::new(|| {
    GRAMMARS
        .iter()
        .map(|g| (Regex::new(g.pattern).expect("Invalid table grammar"), g))
        .collect()
});

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("Invalid link regex"));
static DOWNLOAD_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href=["']([^"']+)["'][^>]*download[^>]*>(.*?)</a>"#)
        .expect("Invalid anchor regex")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));
static IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif|svg)$").expect("Invalid image regex"));
static SHEET_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(xlsx|xls)$").expect("Invalid sheet regex"));

fn field_value(raw: &str, field: Field) -> Value {
    let raw = raw.trim();
    match field {
        Field::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(raw)),
        Field::Text => Value::from(raw),
    }
}

/// Splits the lines not covered by `spans` into those above the first
/// covered line and all the others.
fn surrounding_text(text: &str, spans: &[Range<usize>]) -> (String, String) {
    let mut lead = Vec::new();
    let mut trail = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let range = offset..offset + line.len();
        offset = range.end;
        if spans.iter().any(|s| s.start < range.end && range.start < s.end) {
            continue;
        }
        let line = line.trim_end();
        if spans.first().is_some_and(|s| range.end <= s.start) {
            lead.push(line);
        } else {
            trail.push(line);
        }
    }
    (
        lead.join("\n").trim().to_string(),
        trail.join("\n").trim().to_string(),
    )
}

/// Tries each grammar in order; the first one matching at least one line wins.
pub fn extract_table(text: &str) -> Option<Table> {
    for (regex, grammar) in COMPILED.iter() {
        let mut spans = Vec::new();
        let records: Vec<Record> = regex
            .captures_iter(text)
            .map(|caps| {
                if let Some(whole) = caps.get(0) {
                    spans.push(whole.range());
                }
                grammar
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, (name, field))| {
                        let raw = caps.get(i + 1).map_or("", |m| m.as_str());
                        (name.to_string(), field_value(raw, *field))
                    })
                    .collect()
            })
            .collect();
        if !records.is_empty() {
            let (lead, trail) = surrounding_text(text, &spans);
            return Some(Table {
                records,
                filename: grammar.filename,
                sheet: grammar.sheet,
                lead,
                trail,
            });
        }
    }
    None
}

/// Drops HTML tags and keeps the text between them.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

fn kind_of(url: &str) -> LinkKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if IMAGE_EXT.is_match(path) {
        LinkKind::Image
    } else if SHEET_EXT.is_match(path) {
        LinkKind::Spreadsheet
    } else {
        LinkKind::File
    }
}

/// First markdown link, else first anchor carrying a `download` attribute.
pub fn extract_link(text: &str) -> Option<Link> {
    let (range, label, url) = if let Some(caps) = MARKDOWN_LINK.captures(text) {
        let whole = caps.get(0)?;
        (whole.range(), caps[1].to_string(), caps[2].to_string())
    } else {
        let caps = DOWNLOAD_ANCHOR.captures(text)?;
        let whole = caps.get(0)?;
        let label = strip_tags(&caps[2]).trim().to_string();
        (whole.range(), label, caps[1].to_string())
    };
    let label = if label.is_empty() {
        "Download".to_string()
    } else {
        label
    };
    let mut context = String::with_capacity(text.len());
    context.push_str(&text[..range.start]);
    context.push_str(&text[range.end..]);
    Some(Link {
        kind: kind_of(&url),
        label,
        url,
        context: context.trim().to_string(),
    })
}

struct Classifier {
    enabled: fn(&ChatConfig) -> bool,
    matches: fn(&str) -> bool,
    extract: fn(&str) -> Option<Reply>,
}

fn always(_: &ChatConfig) -> bool {
    true
}

fn tables_enabled(config: &ChatConfig) -> bool {
    config.enable_table_parsing
}

fn has_spreadsheet_link(text: &str) -> bool {
    extract_link(text).is_some_and(|l| l.kind == LinkKind::Spreadsheet)
}

fn has_table_markers(text: &str) -> bool {
    text.contains("Pincode:") || text.contains("Order ID:")
}

fn has_link_markup(text: &str) -> bool {
    text.contains("](") || text.to_ascii_lowercase().contains("<a ")
}

fn link_reply(text: &str) -> Option<Reply> {
    extract_link(text).map(Reply::Link)
}

fn table_reply(text: &str) -> Option<Reply> {
    extract_table(text).map(Reply::Table)
}

// Embedded spreadsheets beat tables parsed out of the same text.
const CLASSIFIERS: &[Classifier] = &[
    Classifier {
        enabled: always,
        matches: has_spreadsheet_link,
        extract: link_reply,
    },
    Classifier {
        enabled: tables_enabled,
        matches: has_table_markers,
        extract: table_reply,
    },
    Classifier {
        enabled: always,
        matches: has_link_markup,
        extract: link_reply,
    },
];

pub fn interpret(text: &str, config: &ChatConfig) -> Reply {
    CLASSIFIERS
        .iter()
        .filter(|c| (c.enabled)(config) && (c.matches)(text))
        .find_map(|c| (c.extract)(text))
        .unwrap_or_else(|| Reply::PlainText(text.to_string()))
}

pub fn is_download_trigger(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRIGGER_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Index of the only bot message that gets the "Download Orders" action.
pub fn download_anchor(messages: &[Message]) -> Option<usize> {
    messages
        .iter()
        .rposition(|m| m.is_bot() && is_download_trigger(&m.text))
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadPlan {
    /// Fetch a file the bot already produced.
    Remote { url: String, filename: String },
    /// Build a workbook from rows held in memory.
    Local {
        records: Vec<Record>,
        filename: String,
        sheet: String,
    },
}

/// Decides what "Download Orders" saves for `message`. A spreadsheet URL in
/// the reply always wins over rows parsed from its text.
pub fn plan_download(message: &Message, config: &ChatConfig) -> Result<DownloadPlan, ChatError> {
    if let Some(link) = extract_link(&message.text).filter(|l| l.forced_download()) {
        return Ok(DownloadPlan::Remote {
            filename: link.filename(),
            url: link.url,
        });
    }
    if let Some(url) = message.excel_url() {
        return Ok(DownloadPlan::Remote {
            url: url.to_string(),
            filename: filename_of(url),
        });
    }
    if config.enable_table_parsing {
        if let Some(table) = extract_table(&message.text) {
            return Ok(DownloadPlan::Local {
                records: table.records,
                filename: table.filename.to_string(),
                sheet: table.sheet.to_string(),
            });
        }
    }
    if let Some(records) = message.table_data() {
        return Ok(DownloadPlan::Local {
            records,
            filename: EXPORT_FILENAME.to_string(),
            sheet: EXPORT_SHEET.to_string(),
        });
    }
    Err(ChatError::NoDataToExport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_simple_order_lines() {
        let table =
            extract_table("- Order ID: A1 | Status: Pending\n- Order ID: A2 | Status: Delivered")
                .unwrap();
        assert_eq!(
            table.records,
            records(json!([
                {"Order ID": "A1", "Status": "Pending"},
                {"Order ID": "A2", "Status": "Delivered"}
            ]))
        );
        assert_eq!(table.columns(), vec!["Order ID", "Status"]);
        assert_eq!(table.filename, "pending_orders.xlsx");
    }

    #[test]
    fn test_simple_lines_need_exactly_two_fields() {
        assert!(extract_table("- Order ID: A1 | Status: Pending | Priority: High").is_none());
        let table = extract_table("- Order ID: A1 | Status: Pending\r\n").unwrap();
        assert_eq!(table.records[0]["Status"], json!("Pending"));
    }

    #[test]
    fn test_table_keeps_surrounding_lines() {
        let config = ChatConfig::default();
        let text = "Pending orders for Wakefit:\n- Order ID: A1 | Status: Pending\n- Order ID: A2 | Status: Pending\nTotal pending orders: 2";
        match interpret(text, &config) {
            Reply::Table(table) => {
                assert_eq!(table.records.len(), 2);
                assert_eq!(table.lead, "Pending orders for Wakefit:");
                assert_eq!(table.trail, "Total pending orders: 2");
            }
            other => panic!("expected a table, got {other:?}"),
        }

        let table = extract_table("- Order ID: A1 | Status: Pending").unwrap();
        assert_eq!(table.lead, "");
        assert_eq!(table.trail, "");
    }

    #[test]
    fn test_pincode_lines() {
        let table = extract_table("Pincode: 500081 → 12 orders\nPincode: 500032 → 5 orders").unwrap();
        assert_eq!(
            table.records,
            records(json!([
                {"Pincode": "500081", "Orders": 12},
                {"Pincode": "500032", "Orders": 5}
            ]))
        );
        assert_eq!(table.filename, "top_pincodes.xlsx");
        assert_eq!(table.sheet, "Pincodes");
    }

    #[test]
    fn test_numbered_pincode_lines() {
        let text = "Top pincodes for Ola Ele:\n1. Pincode: 530013 → 40 orders\n2. Pincode: 530017 → 7 orders\n";
        let table = extract_table(text).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1]["Orders"], json!(7));
    }

    #[test]
    fn test_full_order_lines() {
        let text = "Pending orders:\n- Order ID: OLAELE04199 | Status: Pending | To: Hyderabad | Created: 2025-06-21\n- Order ID: WKFT221 | Status: In Transit | To: Coimbatore | Created: 2025-07-02";
        let table = extract_table(text).unwrap();
        assert_eq!(table.columns(), vec!["Order ID", "Status", "To", "Created"]);
        assert_eq!(table.records[1]["Status"], json!("In Transit"));
        assert_eq!(table.records[1]["Created"], json!("2025-07-02"));
    }

    #[test]
    fn test_customer_variant_beats_simple() {
        let text = "- Order ID: A9 | Customer: Wakefit | Status: Delivered | Date: 2025-06-30";
        let table = extract_table(text).unwrap();
        assert_eq!(table.columns(), vec!["Order ID", "Customer", "Status", "Date"]);
    }

    #[test]
    fn test_created_at_variant() {
        let text = "- Order ID: A3 | Status: Pending | Created At: 2025-07-01 10:00";
        let table = extract_table(text).unwrap();
        assert_eq!(table.columns(), vec!["Order ID", "Status", "Created At"]);
        assert_eq!(table.records[0]["Created At"], json!("2025-07-01 10:00"));
    }

    #[test]
    fn test_no_table() {
        assert!(extract_table("Your order is in transit.").is_none());
        let config = ChatConfig::default();
        assert_eq!(
            interpret("Your order is in transit.", &config),
            Reply::PlainText("Your order is in transit.".into())
        );
    }

    #[test]
    fn test_table_parsing_disabled() {
        let config = ChatConfig {
            enable_table_parsing: false,
            ..ChatConfig::default()
        };
        let text = "- Order ID: A1 | Status: Pending";
        assert_eq!(interpret(text, &config), Reply::PlainText(text.into()));
    }

    #[test]
    fn test_image_link() {
        let config = ChatConfig::default();
        let reply = interpret(
            "Here is the trend: [Order trend](https://host/static/trend.PNG)",
            &config,
        );
        match reply {
            Reply::Link(link) => {
                assert_eq!(link.kind, LinkKind::Image);
                assert_eq!(link.label, "Order trend");
                assert_eq!(link.context, "Here is the trend:");
                assert!(!link.forced_download());
            }
            other => panic!("expected a link, got {other:?}"),
        }
    }

    #[test]
    fn test_download_anchor_markup() {
        let link = extract_link(
            r#"Report ready <a href='https://host/files/report.xlsx?v=2' download>Get report</a>"#,
        )
        .unwrap();
        assert_eq!(link.kind, LinkKind::Spreadsheet);
        assert!(link.forced_download());
        assert_eq!(link.label, "Get report");
        assert_eq!(link.filename(), "report.xlsx");
    }

    #[test]
    fn test_anchor_wrapping_a_button() {
        let text = concat!(
            r#"<a href="http://51.20.18.59:8080/static/files/pending_orders_Wakefit_7days.xlsx" download target="_blank">"#,
            r#"<button style="padding: 10px 20px; background-color: #4CAF50; color: white; border: none; border-radius: 5px;">📥 Download Excel</button>"#,
            r#"</a>"#
        );
        let link = extract_link(text).unwrap();
        assert_eq!(link.label, "📥 Download Excel");
        assert_eq!(link.kind, LinkKind::Spreadsheet);
        assert_eq!(link.filename(), "pending_orders_Wakefit_7days.xlsx");
        assert_eq!(link.context, "");

        let bare = extract_link(r#"<a href="https://host/r.xlsx" download><span></span></a>"#).unwrap();
        assert_eq!(bare.label, "Download");
    }

    #[test]
    fn test_spreadsheet_link_beats_table_text() {
        let config = ChatConfig::default();
        let text = "- Order ID: A1 | Status: Pending\n[Download Excel](https://host/files/pending.xlsx)";
        assert!(matches!(interpret(text, &config), Reply::Link(_)));

        let message = Message::bot(text);
        assert_eq!(
            plan_download(&message, &config).unwrap(),
            DownloadPlan::Remote {
                url: "https://host/files/pending.xlsx".into(),
                filename: "pending.xlsx".into(),
            }
        );
    }

    #[test]
    fn test_table_text_beats_plain_file_link() {
        let config = ChatConfig::default();
        let text = "- Order ID: A1 | Status: Pending\n[Details](https://host/orders/A1)";
        assert!(matches!(interpret(text, &config), Reply::Table(_)));
    }

    #[test]
    fn test_plan_from_parsed_text() {
        let config = ChatConfig::default();
        let message = Message::bot("Pincode: 500081 → 12 orders");
        match plan_download(&message, &config).unwrap() {
            DownloadPlan::Local {
                records,
                filename,
                sheet,
            } => {
                assert_eq!(records.len(), 1);
                assert_eq!(filename, "top_pincodes.xlsx");
                assert_eq!(sheet, "Pincodes");
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_plan_from_backend_rows() {
        let config = ChatConfig::default();
        let mut message = Message::bot("Here are the pending orders");
        message.custom = Some(json!({"table_data": [{"Order ID": "A1"}]}));
        match plan_download(&message, &config).unwrap() {
            DownloadPlan::Local { filename, .. } => assert_eq!(filename, EXPORT_FILENAME),
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_plan_nothing() {
        let config = ChatConfig::default();
        let err = plan_download(&Message::bot("No pending orders found."), &config).unwrap_err();
        assert!(matches!(err, ChatError::NoDataToExport));
    }

    #[test]
    fn test_download_anchor_moves() {
        let mut messages = vec![
            Message::user("Show all pending orders"),
            Message::bot("- Order ID: A1 | Status: Pending"),
        ];
        assert_eq!(download_anchor(&messages), Some(1));

        messages.push(Message::bot("Anything else?"));
        assert_eq!(download_anchor(&messages), Some(1));

        messages.push(Message::user("Top delivery pincodes for Ola Ele"));
        messages.push(Message::bot("PINCODE: 530013 → 40 orders"));
        assert_eq!(download_anchor(&messages), Some(4));

        // User text never carries the action.
        messages.push(Message::user("- Order ID: X"));
        assert_eq!(download_anchor(&messages), Some(4));
    }

    #[test]
    fn test_filename_of_relative() {
        assert_eq!(filename_of("/static/out/report.xls"), "report.xls");
        assert_eq!(filename_of("https://host/"), EXPORT_FILENAME);
    }
}
