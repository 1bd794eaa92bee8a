//! Built-in sample data served when the backend cannot answer and
//! `api.offline_fallback` is on.

use crate::types::{
    DefectTrend, DefectTypeCount, ExecutiveSummary, KpiData, Machine, MachineHealth,
    MachineStatus, RootCauseCount, SeverityCount,
};
use chrono::{Datelike, Days, NaiveDate};
use time::OffsetDateTime;

const TREND_TARGET: u32 = 10;
const MAX_SAMPLE_TREND_DAYS: u32 = 366;

fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn machine(id: &str, name: &str) -> Machine {
    Machine {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub(crate) fn sample_machines() -> Vec<Machine> {
    vec![
        machine("CMX800", "CMX800"),
        machine("DMG-1", "DMG MORI NLX 2500"),
        machine("MAZ-001", "Mazak Quick Turn 250"),
    ]
}

pub(crate) fn sample_kpis() -> KpiData {
    KpiData {
        total_defects: 156,
        total_machines: 12,
        total_operators: 8,
        total_customers: 5,
        avg_defect_rate: 0.023,
        critical_machines: 3,
        critical_defects: Some(12),
    }
}

pub(crate) fn sample_executive_summary() -> ExecutiveSummary {
    let causes = [
        ("工具摩耗", 45),
        ("材料不良", 32),
        ("設定ミス", 28),
        ("機械故障", 21),
        ("オペレーターミス", 18),
    ];
    let types = [
        ("寸法不良", 52),
        ("表面傷", 38),
        ("形状不良", 29),
        ("バリ", 25),
        ("変色", 12),
    ];
    let severities = [("High", 24), ("Medium", 67), ("Low", 65)];

    ExecutiveSummary {
        top_root_causes: causes
            .iter()
            .map(|(cause, count)| RootCauseCount {
                cause: cause.to_string(),
                count: *count,
            })
            .collect(),
        defect_types: types
            .iter()
            .map(|(defect_type, count)| DefectTypeCount {
                defect_type: defect_type.to_string(),
                count: *count,
            })
            .collect(),
        severity_distribution: severities
            .iter()
            .map(|(severity, count)| SeverityCount {
                severity: severity.to_string(),
                count: *count,
            })
            .collect(),
        last_updated: now_iso(),
    }
}

/// One entry per day for the `days` ending on `today`, oldest first, labelled `M/D`.
/// The window is capped at a year.
pub(crate) fn sample_defect_trends(days: u32, today: NaiveDate) -> Vec<DefectTrend> {
    (0..days.min(MAX_SAMPLE_TREND_DAYS))
        .rev()
        .filter_map(|offset| {
            let date = today.checked_sub_days(Days::new(u64::from(offset)))?;
            Some(DefectTrend {
                date: format!("{}/{}", date.month(), date.day()),
                defects: 5 + (date.ordinal() * 7) % 15,
                target: TREND_TARGET,
            })
        })
        .collect()
}

pub(crate) fn sample_machine_status() -> Vec<MachineStatus> {
    let rows = [
        ("CMX800", 1.2, 8, MachineHealth::Good),
        ("DMG NLX", 3.5, 15, MachineHealth::Warning),
        ("Mazak QT", 5.8, 22, MachineHealth::Critical),
        ("Okuma LB", 2.1, 12, MachineHealth::Good),
        ("Haas VF2", 4.2, 18, MachineHealth::Warning),
    ];
    rows.iter()
        .map(|(name, defect_rate, incidents, status)| MachineStatus {
            name: name.to_string(),
            defect_rate: *defect_rate,
            incidents: *incidents,
            status: *status,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trends_cover_window_ending_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let trends = sample_defect_trends(7, today);
        assert_eq!(trends.len(), 7);
        assert_eq!(trends.first().unwrap().date, "2/24");
        assert_eq!(trends.last().unwrap().date, "3/2");
        assert!(trends
            .iter()
            .all(|t| t.target == TREND_TARGET && (5..20).contains(&t.defects)));
    }

    #[test]
    fn zero_day_window_is_empty() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert!(sample_defect_trends(0, today).is_empty());
    }

    #[test]
    fn oversized_window_is_capped_at_a_year() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let trends = sample_defect_trends(u32::MAX, today);
        assert_eq!(trends.len(), MAX_SAMPLE_TREND_DAYS as usize);
        assert_eq!(trends.last().unwrap().date, "3/2");
    }

    #[test]
    fn summary_lists_top_five_causes() {
        let summary = sample_executive_summary();
        assert_eq!(summary.top_root_causes.len(), 5);
        assert_eq!(summary.severity_distribution.len(), 3);
        assert!(!summary.last_updated.is_empty());
    }
}
