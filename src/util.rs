use regex::Regex;

/// Last non-empty path segment of `url`, ignoring query and fragment.
pub(crate) fn guess_filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map_or("", |(_, p)| p))
        .unwrap_or(path);
    path.rsplit('/').next().and_then(|s| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    })
}

/// Raw (undecoded) value of the first `name` query parameter in `url`.
pub(crate) fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let re = Regex::new(&format!(r"[?&]{}=([^&#]+)", regex::escape(name)))
        .expect("escaped parameter name is a valid pattern");
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub(crate) fn append_query(url: &str, params: &[(&str, &str)]) -> String {
    let mut out = url.to_string();
    let mut sep = if url.contains('?') { '&' } else { '?' };
    for (k, v) in params {
        out.push(sep);
        sep = '&';
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_path_segment() {
        assert_eq!(
            guess_filename_from_url("https://host/dl/0/abc/output_20190305.zip").as_deref(),
            Some("output_20190305.zip")
        );
        assert_eq!(
            guess_filename_from_url("https://host/dl/data.csv?ApiKey=x#frag").as_deref(),
            Some("data.csv")
        );
        assert_eq!(guess_filename_from_url("https://host/dl/"), None);
        assert_eq!(guess_filename_from_url("https://host"), None);
    }

    #[test]
    fn finds_query_parameters() {
        let url = "https://host/download?jobId=7&fileName=three_maps.png&x=1";
        assert_eq!(query_param(url, "fileName"), Some("three_maps.png"));
        assert_eq!(query_param(url, "jobId"), Some("7"));
        assert_eq!(query_param(url, "missing"), None);
        assert_eq!(query_param("https://host/a?fileName=", "fileName"), None);
    }

    #[test]
    fn appends_with_the_right_separator() {
        assert_eq!(append_query("https://h/a", &[("k", "v")]), "https://h/a?k=v");
        assert_eq!(
            append_query("https://h/a?x=1", &[("k", "v"), ("l", "w")]),
            "https://h/a?x=1&k=v&l=w"
        );
    }
}
