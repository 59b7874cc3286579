use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Derives the local markdown path for a page URL
///
/// Layout is `<output_dir>/<host>[_<port>]/<segment>/.../<leaf>.md`. The
/// site root maps to `index.md`. Segments containing characters outside
/// `[A-Za-z0-9._-]` are rewritten and suffixed with a short digest of the
/// original, as is a leaf named `index` and any leaf with a query string, so
/// distinct URLs never share a file.
///
/// # Examples
///
/// ```
/// use docsweep::url::output_path_for;
/// use std::path::Path;
/// use url::Url;
///
/// let url = Url::parse("https://example.test/docs/guide/intro").unwrap();
/// let path = output_path_for(Path::new("out"), &url);
/// assert_eq!(path, Path::new("out/example.test/docs/guide/intro.md"));
/// ```
pub fn output_path_for(output_dir: &Path, url: &Url) -> PathBuf {
    let mut path = output_dir.to_path_buf();

    let host = url.host_str().unwrap_or("unknown-host");
    match url.port() {
        Some(port) => path.push(format!("{}_{}", sanitize_segment(host), port)),
        None => path.push(sanitize_segment(host)),
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let Some((leaf, dirs)) = segments.split_last() else {
        let name = match url.query() {
            Some(query) => format!("index-{}.md", short_digest(query)),
            None => "index.md".to_string(),
        };
        path.push(name);
        return path;
    };

    for dir in dirs {
        path.push(sanitize_segment(dir));
    }

    let mut leaf_name = sanitize_segment(leaf);
    if leaf_name == "index" {
        leaf_name = format!("index-{}", short_digest(leaf));
    }
    if let Some(query) = url.query() {
        leaf_name = format!("{}-{}", leaf_name, short_digest(query));
    }
    path.push(format!("{}.md", leaf_name));

    path
}

/// Makes one path segment safe for the local filesystem
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = if cleaned.starts_with('.') {
        format!("_{}", &cleaned[1..])
    } else {
        cleaned
    };

    if cleaned == segment {
        cleaned
    } else {
        format!("{}-{}", cleaned, short_digest(segment))
    }
}

fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_for(url: &str) -> PathBuf {
        output_path_for(Path::new("out"), &Url::parse(url).unwrap())
    }

    #[test]
    fn test_root_maps_to_index() {
        assert_eq!(
            path_for("https://example.test/"),
            Path::new("out/example.test/index.md")
        );
    }

    #[test]
    fn test_nested_path() {
        assert_eq!(
            path_for("https://example.test/documentation/swift/array"),
            Path::new("out/example.test/documentation/swift/array.md")
        );
    }

    #[test]
    fn test_port_in_host_dir() {
        assert_eq!(
            path_for("http://127.0.0.1:8080/docs"),
            Path::new("out/127.0.0.1_8080/docs.md")
        );
    }

    #[test]
    fn test_directory_and_child_do_not_collide() {
        let parent = path_for("https://example.test/docs/a");
        let child = path_for("https://example.test/docs/a/b");
        assert_ne!(parent, child);
    }

    #[test]
    fn test_literal_index_does_not_collide_with_root() {
        assert_ne!(
            path_for("https://example.test/"),
            path_for("https://example.test/index")
        );
    }

    #[test]
    fn test_query_disambiguates() {
        let a = path_for("https://example.test/search?q=array");
        let b = path_for("https://example.test/search?q=dictionary");
        assert_ne!(a, b);
        assert_ne!(a, path_for("https://example.test/search"));
    }

    #[test]
    fn test_unsafe_segments_are_sanitized_and_distinct() {
        let a = path_for("https://example.test/docs/a%20b");
        let b = path_for("https://example.test/docs/a_b");
        assert_ne!(a, b);
        assert!(a.to_string_lossy().contains("a_20b-"));
    }

    #[test]
    fn test_stable_derivation() {
        assert_eq!(
            path_for("https://example.test/docs/x?y=1"),
            path_for("https://example.test/docs/x?y=1")
        );
    }
}
