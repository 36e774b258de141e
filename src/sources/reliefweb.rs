use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::AppError;
use crate::models::job::Job;
use crate::normalize::{RawJob, normalize};

const BASE_URL: &str = "https://api.reliefweb.int/v1/jobs";

/// Fetch one page of structured job listings. The appname query
/// parameter identifies this application to the API.
pub async fn fetch(
    client: &reqwest::Client,
    appname: &str,
    max_jobs: usize,
) -> Result<Vec<Job>, AppError> {
    let url = format!("{BASE_URL}?appname={appname}&limit={max_jobs}&profile=full");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AppError::Source(format!("ReliefWeb request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::Source(format!(
            "ReliefWeb returned {}",
            resp.status()
        )));
    }

    let data: Value = resp
        .json()
        .await
        .map_err(|e| AppError::Source(format!("ReliefWeb response was not JSON: {e}")))?;

    Ok(parse_items(&data, max_jobs))
}

/// Map the response's item array into normalized jobs. Title is the
/// only hard validation gate; everything else has a fallback chain
/// because the upstream schema is inconsistently populated.
fn parse_items(data: &Value, max_jobs: usize) -> Vec<Job> {
    let items = data
        .get("data")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();

    let mut jobs = Vec::new();
    for item in items {
        if jobs.len() >= max_jobs {
            break;
        }
        match parse_item(item) {
            Some(job) => jobs.push(job),
            None => tracing::debug!("reliefweb: dropping item without usable title"),
        }
    }
    jobs
}

fn parse_item(item: &Value) -> Option<Job> {
    let fields = item.get("fields").unwrap_or(item);

    let title = fields.get("title").and_then(|v| v.as_str())?;
    if title.trim().is_empty() {
        return None;
    }

    let source_id = item
        .get("id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .filter(|s| !s.is_empty())?;

    // Countries come back as a list of {name}; join them, falling back
    // to the first city when no country is set.
    let location = join_names(fields.get("country"))
        .or_else(|| first_name(fields.get("city")));

    let organization = first_name(fields.get("source")).or_else(|| {
        fields
            .get("organization")
            .and_then(|v| v.as_str())
            .map(String::from)
    });

    let tags = collect_names(fields.get("career_categories"))
        .or_else(|| collect_names(fields.get("theme")))
        .unwrap_or_default();

    let description = fields
        .get("body")
        .or_else(|| fields.get("body-html"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let link = fields
        .get("url")
        .or_else(|| fields.get("url_alias"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let date_posted = fields
        .get("date")
        .and_then(|d| d.get("created"))
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));

    Some(normalize(
        "reliefweb",
        RawJob {
            source_id,
            title: Some(title.to_string()),
            organization,
            location,
            link,
            description,
            date_posted,
            tags,
            salary: None,
            country_slug: None,
        },
    ))
}

/// Join every `{name}` entry in a list field with ", ".
fn join_names(value: Option<&Value>) -> Option<String> {
    collect_names(value).map(|names| names.join(", "))
}

fn first_name(value: Option<&Value>) -> Option<String> {
    collect_names(value).and_then(|mut names| {
        if names.is_empty() {
            None
        } else {
            Some(names.remove(0))
        }
    })
}

fn collect_names(value: Option<&Value>) -> Option<Vec<String>> {
    let names: Vec<String> = value?
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("name").and_then(|v| v.as_str()))
        .map(String::from)
        .collect();
    if names.is_empty() { None } else { Some(names) }
}
