use std::fmt::Write;

use ride_tracker_lib::{activity::Activity, statistics::RideStatistics};

/// Human readable ride summary.
pub fn format_statistics(stats: &RideStatistics) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "Points:           {}", stats.points);
    let _ = writeln!(out, "Distance:         {:.2} km", stats.distance_km());
    let _ = writeln!(out, "Max speed:        {:.1} km/h", stats.max_speed_kmh);
    let _ = writeln!(out, "Average speed:    {:.1} km/h", stats.avg_speed_kmh);
    let _ = writeln!(out, "Current activity: {}", stats.current_activity);
    let _ = writeln!(out, "Activity breakdown:");
    for activity in Activity::ALL {
        let share = stats.activity_breakdown.get(activity);
        let _ = writeln!(out, "  {:<13} {:>5.1}%", activity.as_str(), share);
    }
    out
}

pub fn statistics_json(stats: &RideStatistics) -> serde_json::Result<String> {
    serde_json::to_string_pretty(stats)
}
