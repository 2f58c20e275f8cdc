//! Notion-backed schedule source.
//!
//! Queries a Notion database for pages whose Date property falls on the
//! current day and maps them to meetings.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{Meeting, ScheduleError, ScheduleSource};

const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(rename = "Name")]
    name: Option<TitleProperty>,
    #[serde(rename = "Date")]
    date: Option<DateProperty>,
}

#[derive(Debug, Deserialize)]
struct TitleProperty {
    title: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    plain_text: String,
}

#[derive(Debug, Deserialize)]
struct DateProperty {
    date: Option<DateValue>,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    start: String,
    end: Option<String>,
}

pub struct NotionScheduleSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    database_id: String,
    default_duration: Duration,
}

impl NotionScheduleSource {
    pub fn new(
        api_key: String,
        database_id: String,
        endpoint: Option<String>,
        default_duration: Duration,
    ) -> Self {
        let base_url = endpoint.unwrap_or_else(|| "https://api.notion.com/v1".to_string());

        info!("Initialized Notion schedule source for database {}", database_id);

        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            database_id,
            default_duration,
        }
    }

    fn page_to_meeting(&self, page: Page) -> Option<Meeting> {
        let title = page
            .properties
            .name
            .and_then(|p| p.title.into_iter().next())
            .map(|t| t.plain_text)
            .unwrap_or_else(|| "Untitled meeting".to_string());

        let Some(date) = page.properties.date.and_then(|p| p.date) else {
            warn!(page_id = %page.id, "Schedule page has no Date value, skipping");
            return None;
        };

        let Some(start) = parse_notion_datetime(&date.start) else {
            warn!(page_id = %page.id, start = %date.start, "Unparseable start date, skipping");
            return None;
        };

        let duration = date
            .end
            .as_deref()
            .and_then(parse_notion_datetime)
            .map(|end| end - start)
            .filter(|d| *d > Duration::zero())
            .unwrap_or(self.default_duration);

        Some(Meeting {
            id: page.id,
            title,
            start,
            duration,
        })
    }
}

#[async_trait]
impl ScheduleSource for NotionScheduleSource {
    async fn fetch_today(&self) -> Result<Vec<Meeting>, ScheduleError> {
        let today = Local::now().date_naive();
        let tomorrow = today + Duration::days(1);

        let body = json!({
            "filter": {
                "and": [
                    { "property": "Date", "date": { "on_or_after": today.to_string() } },
                    { "property": "Date", "date": { "before": tomorrow.to_string() } }
                ]
            },
            "sorts": [ { "property": "Date", "direction": "ascending" } ]
        });

        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        debug!("Querying schedule database: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScheduleError::Unreachable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ScheduleError::Unreachable {
                reason: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(ScheduleError::Rejected {
                reason: format!("status {}: {}", status, text),
            });
        }

        let parsed: QueryResponse =
            serde_json::from_str(&text).map_err(|e| ScheduleError::Malformed {
                reason: e.to_string(),
            })?;

        let mut meetings: Vec<Meeting> = parsed
            .results
            .into_iter()
            .filter_map(|page| self.page_to_meeting(page))
            .collect();
        meetings.sort_by_key(|m| m.start);

        info!("Schedule poll found {} meeting(s) for today", meetings.len());
        Ok(meetings)
    }
}

/// Notion dates come either as full RFC 3339 timestamps or bare dates.
/// Bare dates are taken as local midnight.
fn parse_notion_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let local = Local
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()?;
    Some(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> NotionScheduleSource {
        NotionScheduleSource::new(
            "secret".to_string(),
            "db".to_string(),
            None,
            Duration::minutes(60),
        )
    }

    #[test]
    fn test_parse_rfc3339_datetime() {
        let parsed = parse_notion_datetime("2025-06-07T10:00:00+02:00").unwrap();
        assert_eq!(parsed, "2025-06-07T08:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_parse_bare_date() {
        assert!(parse_notion_datetime("2025-06-07").is_some());
        assert!(parse_notion_datetime("not a date").is_none());
    }

    #[test]
    fn test_page_to_meeting_with_end_time() {
        let page: Page = serde_json::from_value(json!({
            "id": "page-1",
            "properties": {
                "Name": { "title": [ { "plain_text": "Team Sync" } ] },
                "Date": { "date": {
                    "start": "2025-06-07T10:00:00Z",
                    "end": "2025-06-07T10:45:00Z"
                } }
            }
        }))
        .unwrap();

        let meeting = source().page_to_meeting(page).unwrap();
        assert_eq!(meeting.id, "page-1");
        assert_eq!(meeting.title, "Team Sync");
        assert_eq!(meeting.duration, Duration::minutes(45));
    }

    #[test]
    fn test_page_to_meeting_default_duration() {
        let page: Page = serde_json::from_value(json!({
            "id": "page-2",
            "properties": {
                "Name": { "title": [] },
                "Date": { "date": { "start": "2025-06-07T10:00:00Z", "end": null } }
            }
        }))
        .unwrap();

        let meeting = source().page_to_meeting(page).unwrap();
        assert_eq!(meeting.title, "Untitled meeting");
        assert_eq!(meeting.duration, Duration::minutes(60));
    }

    #[test]
    fn test_page_without_date_is_skipped() {
        let page: Page = serde_json::from_value(json!({
            "id": "page-3",
            "properties": {
                "Name": { "title": [ { "plain_text": "No date" } ] },
                "Date": { "date": null }
            }
        }))
        .unwrap();

        assert!(source().page_to_meeting(page).is_none());
    }
}
