//! Bracketed query parameters such as `page[offset]` and `filter[age][min]`.

use std::collections::HashMap;
use std::str::FromStr;

use buddy_db::matching::{Page, UserFilter};
use buddy_types::models::Gender;
use buddy_types::validation::{validate_code2, validate_username};

use crate::error::{ApiError, ApiResult};

pub const MAX_PAGE_LIMIT: u32 = 100;
pub const MAX_AGE: u32 = 150;

fn number<T: FromStr>(params: &HashMap<String, String>, key: &str) -> ApiResult<Option<T>> {
    match params.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::invalid(key, format!("{key} must be a non-negative integer"))),
    }
}

/// Comma separated values; empty items are skipped.
fn list<'a>(params: &'a HashMap<String, String>, key: &str) -> Vec<&'a str> {
    params
        .get(key)
        .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

pub fn parse_page(params: &HashMap<String, String>) -> ApiResult<Page> {
    let mut page = Page::default();
    if let Some(offset) = number::<u32>(params, "page[offset]")? {
        page.offset = offset;
    }
    if let Some(limit) = number::<u32>(params, "page[limit]")? {
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(ApiError::invalid(
                "page[limit]",
                format!("page[limit] must be between 1 and {MAX_PAGE_LIMIT}"),
            ));
        }
        page.limit = limit;
    }
    Ok(page)
}

pub fn parse_user_filter(params: &HashMap<String, String>) -> ApiResult<UserFilter> {
    let genders = list(params, "filter[gender]")
        .into_iter()
        .map(|g| {
            g.parse::<Gender>()
                .map_err(|_| ApiError::invalid("filter[gender]", format!("unknown gender {g}")))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let languages = list(params, "filter[language]")
        .into_iter()
        .map(|code| {
            validate_code2(code)
                .map(|_| code.to_string())
                .map_err(|_| ApiError::invalid("filter[language]", format!("invalid language {code}")))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let min_age = age(params, "filter[age][min]")?;
    let max_age = age(params, "filter[age][max]")?;
    if let (Some(min), Some(max)) = (min_age, max_age) {
        if min > max {
            return Err(ApiError::invalid(
                "filter[age]",
                "filter[age][min] must not exceed filter[age][max]",
            ));
        }
    }

    Ok(UserFilter {
        genders,
        min_age,
        max_age,
        languages,
    })
}

fn age(params: &HashMap<String, String>, key: &str) -> ApiResult<Option<i64>> {
    match number::<u32>(params, key)? {
        Some(years) if years > MAX_AGE => Err(ApiError::invalid(
            key,
            format!("{key} must be at most {MAX_AGE}"),
        )),
        years => Ok(years.map(i64::from)),
    }
}

/// `filter[with]` of the conversation listing.
pub fn parse_with(params: &HashMap<String, String>) -> ApiResult<String> {
    let with = params
        .get("filter[with]")
        .ok_or_else(|| ApiError::invalid("filter[with]", "filter[with] is required"))?;
    validate_username(with).map_err(|_| ApiError::invalid("filter[with]", "invalid username"))?;
    Ok(with.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn page_defaults() {
        assert_eq!(parse_page(&params(&[])).unwrap(), Page::default());

        let page = parse_page(&params(&[("page[offset]", "20"), ("page[limit]", "5")])).unwrap();
        assert_eq!(page, Page { offset: 20, limit: 5 });
    }

    #[test]
    fn page_rejects_bad_numbers() {
        assert!(parse_page(&params(&[("page[offset]", "-1")])).is_err());
        assert!(parse_page(&params(&[("page[limit]", "0")])).is_err());
        assert!(parse_page(&params(&[("page[limit]", "101")])).is_err());
        assert!(parse_page(&params(&[("page[limit]", "ten")])).is_err());
    }

    #[test]
    fn filters_parse_lists_and_bounds() {
        let filter = parse_user_filter(&params(&[
            ("filter[gender]", "female,other"),
            ("filter[age][min]", "20"),
            ("filter[age][max]", "30"),
            ("filter[language]", "en, cs"),
        ]))
        .unwrap();

        assert_eq!(filter.genders, [Gender::Female, Gender::Other]);
        assert_eq!(filter.min_age, Some(20));
        assert_eq!(filter.max_age, Some(30));
        assert_eq!(filter.languages, ["en", "cs"]);
    }

    #[test]
    fn empty_filters_do_not_filter() {
        let filter = parse_user_filter(&params(&[("filter[gender]", ""), ("filter[language]", "")]))
            .unwrap();
        assert_eq!(filter, UserFilter::default());
    }

    #[test]
    fn filters_reject_unknown_values() {
        assert!(parse_user_filter(&params(&[("filter[gender]", "robot")])).is_err());
        assert!(parse_user_filter(&params(&[("filter[language]", "eng")])).is_err());
        assert!(
            parse_user_filter(&params(&[("filter[age][min]", "40"), ("filter[age][max]", "30")]))
                .is_err()
        );
    }

    #[test]
    fn ages_are_capped() {
        let filter = parse_user_filter(&params(&[("filter[age][max]", "150")])).unwrap();
        assert_eq!(filter.max_age, Some(150));

        for key in ["filter[age][min]", "filter[age][max]"] {
            match parse_user_filter(&params(&[(key, "4000000000")])) {
                Err(ApiError::Validation(fields)) => assert_eq!(fields[0].pointer, key),
                other => panic!("unexpected {other:?}"),
            }
            assert!(parse_user_filter(&params(&[(key, "151")])).is_err());
        }
    }

    #[test]
    fn with_is_required_and_validated() {
        assert_eq!(parse_with(&params(&[("filter[with]", "anna")])).unwrap(), "anna");
        assert!(parse_with(&params(&[])).is_err());
        assert!(parse_with(&params(&[("filter[with]", "Not Valid")])).is_err());
    }
}
