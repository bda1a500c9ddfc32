use regex::Regex;

use super::types::{OutputLine, TestSummary};

/// Extracts pass/fail counters from test output.
///
/// Understands libtest lines (`test result: ok. 3 passed; 0 failed; 1 ignored; ...`,
/// summed over every test binary) and pytest's closing line
/// (`==== 3 passed, 1 failed, 2 skipped in 0.12s ====`).
pub struct SummaryParser {
    libtest: Regex,
    pytest: Regex,
    pytest_count: Regex,
}

impl SummaryParser {
    pub fn new() -> Self {
        Self {
            libtest: Regex::new(
                r"test result: \w+\. (\d+) passed; (\d+) failed; (\d+) ignored",
            )
            .expect("static regex"),
            pytest: Regex::new(r"^=+ (.+) in [\d.]+s.* =+$").expect("static regex"),
            pytest_count: Regex::new(r"(\d+) (passed|failed|skipped|error|errors)")
                .expect("static regex"),
        }
    }

    pub fn parse(&self, lines: &[OutputLine]) -> Option<TestSummary> {
        let mut summary = TestSummary::default();
        let mut found = false;

        for line in lines {
            let text = line.text.trim();
            if let Some(caps) = self.libtest.captures(text) {
                summary.passed += number(&caps[1]);
                summary.failed += number(&caps[2]);
                summary.skipped += number(&caps[3]);
                found = true;
            } else if let Some(caps) = self.pytest.captures(text) {
                for count in self.pytest_count.captures_iter(&caps[1]) {
                    let n = number(&count[1]);
                    match &count[2] {
                        "passed" => summary.passed += n,
                        "skipped" => summary.skipped += n,
                        _ => summary.failed += n,
                    }
                }
                found = true;
            }
        }

        found.then_some(summary)
    }
}

impl Default for SummaryParser {
    fn default() -> Self {
        Self::new()
    }
}

fn number(text: &str) -> u32 {
    text.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::types::OutputStream;

    fn lines(texts: &[&str]) -> Vec<OutputLine> {
        texts
            .iter()
            .map(|t| OutputLine {
                stream: OutputStream::Stdout,
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_libtest_summaries_are_summed() {
        let output = lines(&[
            "running 3 tests",
            "test result: ok. 3 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out; finished in 0.01s",
            "test result: FAILED. 1 passed; 2 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.20s",
        ]);

        let summary = SummaryParser::new().parse(&output).unwrap();

        assert_eq!(
            summary,
            TestSummary {
                passed: 4,
                failed: 2,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_pytest_summary() {
        let output = lines(&[
            "tests/test_connection.py::test_can_connect_and_disconnect PASSED",
            "=================== 3 passed, 1 failed, 2 skipped in 0.12s ===================",
        ]);

        let summary = SummaryParser::new().parse(&output).unwrap();

        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_no_summary() {
        assert_eq!(SummaryParser::new().parse(&lines(&["hello", "world"])), None);
    }
}
