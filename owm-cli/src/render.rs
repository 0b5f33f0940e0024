use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use owm_core::{
    ForecastDocument, IntervalForecastDocument, ProbeOutcome, ProbeReport, model::unix_to_utc,
};

pub fn current_and_daily(doc: &ForecastDocument) -> String {
    let offset = offset(doc.timezone_offset);
    let mut out = String::new();

    let place = if doc.timezone.is_empty() {
        format!("{:.3}, {:.3}", doc.lat, doc.lon)
    } else {
        doc.timezone.clone()
    };
    let _ = writeln!(out, "Weather for {place}");

    if let Some(current) = &doc.current {
        let observed = current
            .observed_at()
            .map(|t| local(t, offset).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown time".to_string());
        let _ = writeln!(out, "  Now ({observed}): {}", current.description());
        let _ = writeln!(
            out,
            "  {:.1}°F (feels like {:.1}°F), humidity {}%, wind {:.1} mph",
            current.temp, current.feels_like, current.humidity, current.wind_speed
        );
    }

    if !doc.daily.is_empty() {
        let _ = writeln!(out, "\nDaily:");
        for day in &doc.daily {
            let date = day
                .date()
                .map(|t| local(t, offset).format("%a %b %d").to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(
                out,
                "  {date}: {:.0}–{:.0}°F, {:.0}% precip, {}",
                day.temp.min,
                day.temp.max,
                day.pop * 100.0,
                day.description()
            );
        }
    }

    for alert in &doc.alerts {
        let until = unix_to_utc(alert.end)
            .map(|t| local(t, offset).format("%a %H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "\n! {} until {until} ({})", alert.event, alert.sender_name);
    }

    out
}

pub fn interval_forecast(doc: &IntervalForecastDocument) -> String {
    let offset = offset(doc.city.timezone);
    let mut out = String::new();

    if doc.city.name.is_empty() {
        let _ = writeln!(out, "5-day forecast");
    } else {
        let _ = writeln!(out, "5-day forecast for {}, {}", doc.city.name, doc.city.country);
    }

    for entry in &doc.list {
        let time = entry
            .time()
            .map(|t| local(t, offset).format("%a %H:%M").to_string())
            .unwrap_or_else(|| entry.dt_txt.clone());
        let _ = writeln!(
            out,
            "  {time}: {:.1}°F, {:.0}% precip, {}",
            entry.main.temp,
            entry.pop * 100.0,
            entry.description()
        );
    }

    out
}

pub fn probe_report(report: &ProbeReport) -> String {
    let mut out = String::new();

    for (version, outcome) in report.iter() {
        let label = match outcome {
            ProbeOutcome::Entitled => "entitled",
            ProbeOutcome::Denied => "denied",
            ProbeOutcome::NetworkUnreachable => "unreachable",
        };
        let _ = writeln!(out, "{:<12} {label}", version.as_str());
    }

    match report.verdict() {
        Ok(version) => {
            let _ = writeln!(out, "\nPreferred: {version}");
        }
        Err(err) => {
            let _ = writeln!(out, "\n{err}");
        }
    }

    out
}

fn offset(seconds: i64) -> FixedOffset {
    i32::try_from(seconds).ok().and_then(FixedOffset::east_opt).unwrap_or(Utc.fix())
}

fn local(time: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    time.with_timezone(&offset)
}

#[cfg(test)]
mod tests {
    use owm_core::ApiVersion;

    use super::*;

    #[test]
    fn current_and_daily_lists_days_in_local_time() {
        let doc: ForecastDocument = serde_json::from_value(serde_json::json!({
            "lat": 33.749, "lon": -84.388,
            "timezone": "America/New_York", "timezone_offset": -18000,
            "current": {"dt": 1700000000, "temp": 61.54, "feels_like": 60.0, "humidity": 40,
                        "wind_speed": 3.2,
                        "weather": [{"id": 800, "description": "clear sky"}]},
            "daily": [{"dt": 1700000000, "temp": {"min": 45.0, "max": 66.0}, "pop": 0.25}]
        }))
        .unwrap();

        let text = current_and_daily(&doc);

        assert!(text.starts_with("Weather for America/New_York"));
        assert!(text.contains("Now (2023-11-14 17:13): clear sky"));
        assert!(text.contains("61.5°F"));
        assert!(text.contains("Tue Nov 14: 45–66°F, 25% precip"));
    }

    #[test]
    fn probe_report_shows_each_version_and_the_choice() {
        let report = ProbeReport::new(vec![
            (ApiVersion::OneCall3_0, ProbeOutcome::Denied),
            (ApiVersion::OneCall2_5, ProbeOutcome::Entitled),
            (ApiVersion::Weather2_5, ProbeOutcome::Entitled),
        ]);

        let text = probe_report(&report);

        assert!(text.contains("onecall-3.0  denied"));
        assert!(text.contains("Preferred: onecall-2.5"));
    }
}
