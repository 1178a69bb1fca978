use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logged assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestOutcome {
    pub section: String,
    pub description: String,
    pub passed: bool,
}

/// Result log for one run: ordered assertions, a running failure count,
/// and operation-level errors kept apart from the count.
#[derive(Debug)]
pub struct TestLog {
    started_at: DateTime<Utc>,
    section: String,
    entries: Vec<TestOutcome>,
    errors: Vec<String>,
    fail_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passed: bool,
    pub checks: usize,
    pub fail_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub errors: Vec<String>,
    pub entries: Vec<TestOutcome>,
}

impl TestLog {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            section: String::new(),
            entries: Vec::new(),
            errors: Vec::new(),
            fail_count: 0,
        }
    }

    pub fn test_start_header(&mut self, title: impl Into<String>) {
        self.section = title.into();
        tracing::info!("==== {} ====", self.section);
    }

    /// Records one assertion and returns `passed`.
    pub fn log_result(&mut self, passed: bool, message: impl Into<String>) -> bool {
        let description = message.into();
        if passed {
            tracing::info!("PASS: {}", description);
        } else {
            self.fail_count += 1;
            tracing::error!("FAIL: {}", description);
        }

        self.entries.push(TestOutcome {
            section: self.section.clone(),
            description,
            passed,
        });
        passed
    }

    pub fn info(&self, message: impl AsRef<str>) {
        tracing::info!("{}", message.as_ref());
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        tracing::warn!("{}", message.as_ref());
    }

    /// An aborted sub-test. Not counted as a failed assertion.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("ERROR: {}", message);
        self.errors.push(message);
    }

    pub fn get_fail_count(&self) -> usize {
        self.fail_count
    }

    pub fn entries(&self) -> &[TestOutcome] {
        &self.entries
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_report(self, skipped: Option<String>) -> RunReport {
        RunReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            passed: self.fail_count == 0,
            checks: self.entries.len(),
            fail_count: self.fail_count,
            skipped,
            errors: self.errors,
            entries: self.entries,
        }
    }
}

impl Default for TestLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    /// True when every assertion passed and no sub-test was aborted.
    pub fn is_clean(&self) -> bool {
        self.passed && self.errors.is_empty()
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
