//! Built-in runtime release table.
//!
//! Used when no catalog file is given and no refreshed catalog is cached.

use chrono::NaiveDate;

use super::RuntimeRelease;

const RELEASE_NOTES_BASE: &str = "https://docs.databricks.com/aws/en/release-notes/runtime";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Supported releases, oldest first.
pub fn releases() -> Vec<RuntimeRelease> {
    vec![
        RuntimeRelease::new("13.3 LTS", "22.04", "3.10")
            .with_lts(true)
            .with_ml_variant(true)
            .with_spark("3.4.1")
            .with_scala("2.12.15")
            .with_java("Zulu 8.70.0.23-CA-linux64")
            .with_support_window(date(2023, 8, 22), date(2026, 8, 22))
            .with_url(format!("{RELEASE_NOTES_BASE}/13.3lts"))
            .with_library("numpy", "1.21.5")
            .with_library("pandas", "1.4.4")
            .with_library("pyarrow", "8.0.0")
            .with_library("requests", "2.28.1")
            .with_ml_library("mlflow-skinny", "2.5.0")
            .with_ml_library("scikit-learn", "1.1.1")
            .with_ml_library("torch", "2.0.1"),
        RuntimeRelease::new("14.3 LTS", "22.04", "3.10")
            .with_lts(true)
            .with_ml_variant(true)
            .with_spark("3.5.0")
            .with_scala("2.12.15")
            .with_java("Zulu 8.72.0.17-CA-linux64")
            .with_support_window(date(2024, 2, 1), date(2027, 2, 1))
            .with_url(format!("{RELEASE_NOTES_BASE}/14.3lts"))
            .with_library("numpy", "1.23.5")
            .with_library("pandas", "1.5.3")
            .with_library("pyarrow", "8.0.0")
            .with_library("requests", "2.28.1")
            .with_ml_library("mlflow-skinny", "2.9.2")
            .with_ml_library("scikit-learn", "1.3.0")
            .with_ml_library("torch", "2.0.1"),
        RuntimeRelease::new("15.4 LTS", "22.04", "3.11")
            .with_lts(true)
            .with_ml_variant(true)
            .with_spark("3.5.0")
            .with_scala("2.12.15")
            .with_java("Zulu 8.78.0.19-CA-linux64")
            .with_support_window(date(2024, 8, 19), date(2027, 8, 19))
            .with_url(format!("{RELEASE_NOTES_BASE}/15.4lts"))
            .with_library("numpy", "1.23.5")
            .with_library("pandas", "1.5.3")
            .with_library("pyarrow", "14.0.1")
            .with_library("requests", "2.31.0")
            .with_ml_library("mlflow-skinny", "2.11.4")
            .with_ml_library("scikit-learn", "1.3.0")
            .with_ml_library("torch", "2.3.1"),
        RuntimeRelease::new("16.4 LTS", "24.04", "3.12")
            .with_lts(true)
            .with_ml_variant(true)
            .with_spark("3.5.2")
            .with_scala("2.12.18")
            .with_java("Zulu 17.54+21-CA")
            .with_support_window(date(2025, 5, 9), date(2028, 5, 9))
            .with_url(format!("{RELEASE_NOTES_BASE}/16.4lts"))
            .with_library("numpy", "1.26.4")
            .with_library("pandas", "1.5.3")
            .with_library("pyarrow", "15.0.2")
            .with_library("requests", "2.32.2")
            .with_ml_library("mlflow-skinny", "2.19.0")
            .with_ml_library("scikit-learn", "1.4.2")
            .with_ml_library("torch", "2.5.1"),
        RuntimeRelease::new("17.2", "24.04", "3.12")
            .with_ml_variant(true)
            .with_spark("4.0.0")
            .with_scala("2.13.16")
            .with_java("Zulu 17.58+21-CA")
            .with_support_window(date(2025, 9, 16), date(2026, 3, 16))
            .with_url(format!("{RELEASE_NOTES_BASE}/17.2"))
            .with_library("numpy", "2.1.3")
            .with_library("pandas", "2.2.3")
            .with_library("pyarrow", "19.0.1")
            .with_library("requests", "2.32.3"),
        RuntimeRelease::new("17.3 LTS", "24.04", "3.12")
            .with_lts(true)
            .with_ml_variant(true)
            .with_spark("4.0.0")
            .with_scala("2.13.16")
            .with_java("Zulu 17.58+21-CA")
            .with_support_window(date(2025, 10, 22), date(2028, 10, 22))
            .with_url(format!("{RELEASE_NOTES_BASE}/17.3lts"))
            .with_library("numpy", "2.1.3")
            .with_library("pandas", "2.2.3")
            .with_library("pyarrow", "19.0.1")
            .with_library("requests", "2.32.3")
            .with_ml_library("mlflow-skinny", "3.0.1")
            .with_ml_library("scikit-learn", "1.6.1")
            .with_ml_library("torch", "2.7.1"),
    ]
}
