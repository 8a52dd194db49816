//! Post-processing of raw model output.
//!
//! Even when told not to, chat models like to wrap XML in a ```` ```xml ````
//! fence. Only a fence pair that encloses the whole response is removed;
//! anything else is left for the validator to judge.

const XML_FENCE_OPEN: &str = "```xml";
const FENCE_CLOSE: &str = "```";

/// Strip an enclosing ```` ```xml ```` … ```` ``` ```` pair, then trim.
///
/// The fence is recognised only when the untrimmed response starts with
/// ```` ```xml ```` and ends with ```` ``` ````; in that case the first and
/// last lines are dropped. A response without the pair is only trimmed.
pub fn strip_xml_fence(raw: &str) -> String {
    if raw.starts_with(XML_FENCE_OPEN) && raw.ends_with(FENCE_CLOSE) {
        let lines: Vec<&str> = raw.split('\n').collect();
        // A single-line response like "```xml```" has no body to keep.
        if lines.len() < 2 {
            return String::new();
        }
        return lines[1..lines.len() - 1].join("\n").trim().to_string();
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_block() {
        assert_eq!(strip_xml_fence("```xml\n<a/>\n```"), "<a/>");
    }

    #[test]
    fn keeps_multiline_body() {
        let raw = "```xml\n<?xml version=\"1.0\"?>\n<dat:dataPack>\n</dat:dataPack>\n```";
        assert_eq!(
            strip_xml_fence(raw),
            "<?xml version=\"1.0\"?>\n<dat:dataPack>\n</dat:dataPack>"
        );
    }

    #[test]
    fn unfenced_is_only_trimmed() {
        assert_eq!(strip_xml_fence("  \n<a>x</a>\n\n"), "<a>x</a>");
    }

    #[test]
    fn leading_whitespace_defeats_fence_detection() {
        // Mirrors the prefix check: the fence must be the very first thing.
        assert_eq!(strip_xml_fence(" ```xml\n<a/>\n```"), "```xml\n<a/>\n```");
    }

    #[test]
    fn plain_fence_without_xml_tag_is_kept() {
        assert_eq!(strip_xml_fence("```\n<a/>\n```"), "```\n<a/>\n```");
    }

    #[test]
    fn degenerate_single_line_fence() {
        assert_eq!(strip_xml_fence("```xml```"), "");
    }
}
