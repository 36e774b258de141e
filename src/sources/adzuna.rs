use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::AppError;
use crate::models::job::Job;
use crate::normalize::{RawJob, normalize};

const BASE_URL: &str = "https://api.adzuna.com/v1/api/jobs";

/// Country codes the upstream API actually serves.
pub const SUPPORTED_COUNTRIES: &[&str] = &[
    "at", "au", "be", "br", "ca", "ch", "de", "es", "fr", "gb", "in", "it", "mx", "nl", "nz",
    "pl", "sg", "us", "za",
];

/// Expansion of the "all" sentinel.
pub const DEFAULT_COUNTRIES: &[&str] = &["gb", "us", "de", "ch", "nl"];

/// Used when the request carries no usable country at all.
pub const FALLBACK_COUNTRY: &str = "gb";

/// Aggregate result across regions: jobs from every region that
/// succeeded plus the errors of those that did not.
#[derive(Debug, Default)]
pub struct RegionFetch {
    pub jobs: Vec<Job>,
    pub errors: BTreeMap<String, String>,
}

/// Validate requested region codes against the allow-list. The "all"
/// sentinel expands to the default list, unrecognized codes are
/// silently dropped, repeats collapse to their first occurrence, and
/// an empty result degrades to the single fallback region.
pub fn resolve_countries(requested: &[String]) -> Vec<String> {
    if requested.iter().any(|c| c.trim().eq_ignore_ascii_case("all")) {
        return DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect();
    }
    let mut valid: Vec<String> = Vec::new();
    for code in requested {
        let code = code.trim().to_ascii_lowercase();
        if SUPPORTED_COUNTRIES.contains(&code.as_str()) && !valid.contains(&code) {
            valid.push(code);
        }
    }
    if valid.is_empty() {
        vec![FALLBACK_COUNTRY.to_string()]
    } else {
        valid
    }
}

/// Fetch one page of results per region. Both credentials are required
/// before any request goes out; a single region failing is recorded
/// under its code and never loses the other regions' results.
pub async fn fetch(
    client: &reqwest::Client,
    app_id: Option<&str>,
    app_key: Option<&str>,
    countries: &[String],
    max_jobs: usize,
) -> Result<RegionFetch, AppError> {
    let (app_id, app_key) = match (app_id, app_key) {
        (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => (id, key),
        _ => {
            return Err(AppError::Config(
                "Adzuna credentials missing (ADZUNA_APP_ID / ADZUNA_APP_KEY)".to_string(),
            ));
        }
    };

    let mut fetch = RegionFetch::default();
    for country in countries {
        match fetch_region(client, app_id, app_key, country, max_jobs).await {
            Ok(mut jobs) => fetch.jobs.append(&mut jobs),
            Err(e) => {
                tracing::warn!("adzuna: region '{country}' failed: {e}");
                fetch.errors.insert(country.clone(), e.to_string());
            }
        }
    }
    Ok(fetch)
}

async fn fetch_region(
    client: &reqwest::Client,
    app_id: &str,
    app_key: &str,
    country: &str,
    max_jobs: usize,
) -> Result<Vec<Job>, AppError> {
    let url = format!(
        "{BASE_URL}/{country}/search/1?app_id={app_id}&app_key={app_key}&results_per_page={max_jobs}&content-type=application/json"
    );

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AppError::Source(format!("request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::Source(format!("returned {}", resp.status())));
    }

    let data: Value = resp
        .json()
        .await
        .map_err(|e| AppError::Source(format!("response was not JSON: {e}")))?;

    Ok(parse_region(&data, country))
}

fn parse_region(data: &Value, country: &str) -> Vec<Job> {
    data.get("results")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|i| parse_item(i, country)).collect())
        .unwrap_or_default()
}

/// Map one search result. Id, link, and title are all required; items
/// missing any are silently dropped. The region code becomes part of
/// the source id so the same upstream numeric id in two regions stays
/// two distinct records.
fn parse_item(item: &Value, country: &str) -> Option<Job> {
    let raw_id = item.get("id").map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })?;
    let link = item.get("redirect_url").and_then(|v| v.as_str())?;
    let title = item.get("title").and_then(|v| v.as_str())?;

    let organization = item
        .get("company")
        .and_then(|c| c.get("display_name"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let location = item
        .get("location")
        .and_then(|l| l.get("display_name"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .or_else(|| {
            let areas: Vec<&str> = item
                .get("location")
                .and_then(|l| l.get("area"))
                .and_then(|v| v.as_array())?
                .iter()
                .filter_map(|v| v.as_str())
                .collect();
            if areas.is_empty() {
                None
            } else {
                Some(areas.join(", "))
            }
        });

    // Category label, any upstream tag list, and always the upper-cased
    // region code last, for region filtering on the read side.
    let mut tags: Vec<String> = Vec::new();
    if let Some(label) = item
        .get("category")
        .and_then(|c| c.get("label"))
        .and_then(|v| v.as_str())
    {
        tags.push(label.to_string());
    }
    if let Some(upstream) = item.get("tags").and_then(|v| v.as_array()) {
        tags.extend(upstream.iter().filter_map(|v| v.as_str()).map(String::from));
    }
    tags.push(country.to_ascii_uppercase());

    let date_posted = item
        .get("created")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));

    let salary = format_salary(
        item.get("salary_min").and_then(|v| v.as_f64()),
        item.get("salary_max").and_then(|v| v.as_f64()),
    );

    Some(normalize(
        "adzuna",
        RawJob {
            source_id: format!("{country}_{raw_id}"),
            title: Some(title.to_string()),
            organization,
            location,
            link: Some(link.to_string()),
            description: item
                .get("description")
                .and_then(|v| v.as_str())
                .map(String::from),
            date_posted,
            tags,
            salary: Some(salary),
            country_slug: Some(country.to_string()),
        },
    ))
}

/// "min - max" when both bounds are known, the single bound otherwise,
/// empty when the posting lists no compensation.
fn format_salary(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{} - {}", min.round() as i64, max.round() as i64),
        (Some(min), None) => format!("{}", min.round() as i64),
        (None, Some(max)) => format!("{}", max.round() as i64),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_sentinel_expands_to_default_list() {
        let countries = resolve_countries(&["all".to_string()]);
        assert_eq!(countries, DEFAULT_COUNTRIES);
    }

    #[test]
    fn unsupported_codes_are_silently_dropped() {
        let countries = resolve_countries(&["xx".to_string(), "us".to_string()]);
        assert_eq!(countries, vec!["us".to_string()]);
    }

    #[test]
    fn empty_input_falls_back_to_single_region() {
        assert_eq!(resolve_countries(&[]), vec![FALLBACK_COUNTRY.to_string()]);
        // All-invalid input degrades the same way.
        assert_eq!(
            resolve_countries(&["zz".to_string()]),
            vec![FALLBACK_COUNTRY.to_string()]
        );
    }

    #[test]
    fn repeated_codes_collapse_to_first_occurrence() {
        let countries = resolve_countries(&[
            "gb".to_string(),
            "us".to_string(),
            "gb".to_string(),
            "GB".to_string(),
        ]);
        assert_eq!(countries, vec!["gb".to_string(), "us".to_string()]);
    }

    #[test]
    fn codes_are_case_and_whitespace_tolerant() {
        let countries = resolve_countries(&[" GB ".to_string(), "Us".to_string()]);
        assert_eq!(countries, vec!["gb".to_string(), "us".to_string()]);
    }

    fn sample_item() -> Value {
        json!({
            "id": 5127001,
            "title": "Backend Engineer",
            "redirect_url": "https://adzuna.example/5127001",
            "company": {"display_name": "Acme Ltd"},
            "location": {"display_name": "Zurich, Switzerland"},
            "category": {"label": "IT Jobs"},
            "salary_min": 90000.0,
            "salary_max": 120000.0,
            "created": "2026-08-10T08:30:00Z",
            "description": "Build services."
        })
    }

    #[test]
    fn region_is_part_of_identity_and_tags() {
        let job = parse_item(&sample_item(), "ch").unwrap();
        assert_eq!(job.id, "adzuna_ch_5127001");
        assert_eq!(job.country_slug.as_deref(), Some("ch"));
        assert_eq!(job.tags, vec!["IT Jobs".to_string(), "CH".to_string()]);

        // The same upstream id fetched under another region yields a
        // distinct record on purpose.
        let other = parse_item(&sample_item(), "gb").unwrap();
        assert_ne!(job.id, other.id);
    }

    #[test]
    fn salary_formatting() {
        assert_eq!(format_salary(Some(90000.0), Some(120000.0)), "90000 - 120000");
        assert_eq!(format_salary(Some(55000.0), None), "55000");
        assert_eq!(format_salary(None, Some(70000.0)), "70000");
        assert_eq!(format_salary(None, None), "");
    }

    #[test]
    fn items_missing_required_fields_are_dropped() {
        let no_link = json!({"id": 1, "title": "T"});
        let no_title = json!({"id": 1, "redirect_url": "https://x"});
        let no_id = json!({"title": "T", "redirect_url": "https://x"});
        assert!(parse_item(&no_link, "gb").is_none());
        assert!(parse_item(&no_title, "gb").is_none());
        assert!(parse_item(&no_id, "gb").is_none());
    }

    #[test]
    fn area_list_is_location_fallback() {
        let item = json!({
            "id": 2,
            "title": "Analyst",
            "redirect_url": "https://x/2",
            "location": {"area": ["UK", "London"]}
        });
        let job = parse_item(&item, "gb").unwrap();
        assert_eq!(job.location, "UK, London");
    }
}
