//! One pipeline per report: select, build tables, aggregate, lay out sheets.

use std::io::Write;
use std::path::{Path, PathBuf};

use colored::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::IsoWeekKey;
use crate::config::AppConfig;
use crate::error::{HealthRsError, Result};
use crate::export::csv::read_sheet;
use crate::export::text::render_table;
use crate::export::{format_hms, format_pace, write_report, Cell, ExportFormat, ReportTable};
use crate::import::{scan, ExtractStats, Selector};
use crate::last_walk::{build_last_walk_report, latest_workout, LastWalkReport};
use crate::models::{
    BodyMassReading, DistanceSample, HeartRateSample, Vo2MaxReading, WalkingWorkout, BODY_MASS_TYPE,
    HEART_RATE_TYPE, VO2_MAX_TYPE,
};
use crate::table::{EntrySink, Table, TableBuilder};
use crate::vo2max::{build_vo2max_report, correlate_weight_vo2, MIN_CORRELATION_ROWS};
use crate::walking::{
    daily_from_sheet, daily_walking, weekly_from_daily, weekly_workouts, DailyWalk, DAILY_HEADERS,
};
use crate::zones::ZONE_COUNT;

/// The reports this crate can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Vo2Max,
    WeightVo2,
    WeeklyWalks,
    DailyWalk,
    WeeklyFromDaily,
    LastWalk,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Vo2Max,
        ReportKind::WeightVo2,
        ReportKind::WeeklyWalks,
        ReportKind::DailyWalk,
        ReportKind::WeeklyFromDaily,
        ReportKind::LastWalk,
    ];

    /// Stable name, also the file stem of the report's main sheet
    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Vo2Max => "vo2max",
            ReportKind::WeightVo2 => "weight_vo2",
            ReportKind::WeeklyWalks => "weekly_walks",
            ReportKind::DailyWalk => "daily_walk",
            ReportKind::WeeklyFromDaily => "weekly_from_daily",
            ReportKind::LastWalk => "last_walk",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Vo2Max => "VO2max by day",
            ReportKind::WeightVo2 => "Weight vs VO2max",
            ReportKind::WeeklyWalks => "Walking workouts by week",
            ReportKind::DailyWalk => "Daily walking distance",
            ReportKind::WeeklyFromDaily => "Weekly walking from daily totals",
            ReportKind::LastWalk => "Latest walk",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters shown in the summary line of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub stats: ExtractStats,
    /// Rows in the main sheet
    pub rows: usize,
    /// Matched entries that could not be coerced into rows
    pub dropped: usize,
    /// Rows replaced by a later entry with the same timestamp
    pub duplicates: usize,
}

impl RunSummary {
    fn absorb<M>(&mut self, table: &Table<M>) {
        self.dropped += table.dropped;
        self.duplicates += table.duplicates;
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows | scanned {}, matched {}, dropped {}, duplicates {}, bad timestamps {}",
            self.rows,
            self.stats.scanned,
            self.stats.matched,
            self.dropped,
            self.duplicates,
            self.stats.skipped_timestamp
        )
    }
}

/// Sheets and notes of one finished report
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub kind: ReportKind,
    pub sheets: Vec<ReportTable>,
    /// One-line findings shown under the tables (trend, correlation, ...)
    pub notes: Vec<String>,
    pub summary: RunSummary,
}

impl ReportOutput {
    /// Write every sheet in every format; an empty format list writes nothing
    pub fn write(&self, directory: &Path, formats: &[ExportFormat]) -> Result<Vec<PathBuf>> {
        Ok(write_report(&self.sheets, directory, formats)?)
    }

    /// Console form: title, one table per sheet, notes, summary line
    pub fn render(&self) -> String {
        let mut text = format!("\n{}\n", self.kind.title().green().bold());
        for sheet in &self.sheets {
            if self.sheets.len() > 1 {
                text.push_str(&format!("{}\n", sheet.title.cyan().bold()));
            }
            text.push_str(&render_table(sheet));
            text.push('\n');
        }
        for note in &self.notes {
            text.push_str(&format!("  {}\n", note));
        }
        text.push_str(&format!("{}\n", self.summary.to_string().dimmed()));
        text
    }

    /// Prints the report to `out`, then writes its sheets.
    ///
    /// The console report is complete before any file is written, so it is
    /// still shown when writing fails.
    pub fn emit<W: Write>(
        &self,
        out: &mut W,
        directory: &Path,
        formats: &[ExportFormat],
    ) -> Result<Vec<PathBuf>> {
        out.write_all(self.render().as_bytes())?;
        out.flush()?;

        let written = self.write(directory, formats)?;
        for path in &written {
            writeln!(out, "{} {}", "✓ Wrote".green(), path.display())?;
        }
        Ok(written)
    }
}

/// Runs reports against one export with one configuration
#[derive(Debug, Clone)]
pub struct ReportRunner {
    config: AppConfig,
}

impl ReportRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn run(&self, kind: ReportKind) -> Result<ReportOutput> {
        info!("Running {} report", kind);
        let mut output = match kind {
            ReportKind::Vo2Max => self.run_vo2max()?,
            ReportKind::WeightVo2 => self.run_weight_vo2()?,
            ReportKind::WeeklyWalks => self.run_weekly_walks()?,
            ReportKind::DailyWalk => self.run_daily_walk()?,
            ReportKind::WeeklyFromDaily => {
                let (daily, summary) = self.scan_daily_walking(false)?;
                self.weekly_from_daily_output(&daily, summary)?
            }
            ReportKind::LastWalk => self.run_last_walk()?,
        };

        if self.config.output.newest_first {
            for sheet in output.sheets.iter_mut().filter(|s| s.name != LAST_WALK_SUMMARY) {
                sheet.rows.reverse();
            }
        }
        Ok(output)
    }

    /// Weekly walking report built from a daily sheet written earlier
    pub fn run_weekly_from_sheet(&self, path: &Path) -> Result<ReportOutput> {
        if !path.is_file() {
            return Err(HealthRsError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        info!("Reading daily walking sheet {}", path.display());
        let daily = daily_from_sheet(&read_sheet(path)?)?;

        let mut output = self.weekly_from_daily_output(&daily, RunSummary::default())?;
        if self.config.output.newest_first {
            output.sheets.iter_mut().for_each(|s| s.rows.reverse());
        }
        Ok(output)
    }

    fn selector(&self) -> Selector {
        Selector::new().since(self.config.input.since)
    }

    fn walking_selector(&self) -> Selector {
        self.selector()
            .workouts(self.config.walking.activity_types.iter())
            .source_containing(self.config.walking.source_filter.as_deref())
    }

    fn scan(&self, selector: Selector, sinks: &mut [&mut dyn EntrySink]) -> Result<ExtractStats> {
        scan(
            &self.config.input.export_path,
            selector,
            sinks,
            self.config.input.show_progress,
        )
    }

    fn run_vo2max(&self) -> Result<ReportOutput> {
        let mut vo2 = TableBuilder::<Vo2MaxReading>::new();
        let stats = self.scan(self.selector().records([VO2_MAX_TYPE]), &mut [&mut vo2])?;
        let vo2 = vo2.build();
        if vo2.is_empty() {
            return Err(no_data(ReportKind::Vo2Max, "the export holds no VO2max records"));
        }

        let report = build_vo2max_report(&vo2, self.config.vo2max.daily_reduction);

        let mut sheet = ReportTable::new(
            ReportKind::Vo2Max.name(),
            "VO2max",
            ReportKind::Vo2Max.title(),
            &["Date", "VO2max (ml/kg/min)", "Readings", "Change"],
        );
        for day in &report.days {
            sheet.push_row(vec![
                Cell::Date(day.date),
                Cell::number(day.vo2max, 2),
                Cell::Integer(day.readings as i64),
                Cell::opt_number(day.change, 2),
            ]);
        }

        let mut by_month = ReportTable::new(
            VO2MAX_BY_MONTH,
            "VO2max by month",
            "VO2max by month",
            &["Month", "Date", "VO2max (ml/kg/min)"],
        );
        for month in &report.months {
            for day in &month.days {
                by_month.push_row(vec![
                    Cell::text(month.month.to_string()),
                    Cell::Date(day.date),
                    Cell::number(day.vo2max, 2),
                ]);
            }
        }

        let mut notes = vec![format!(
            "Daily value: {} of the day's readings",
            self.config.vo2max.daily_reduction
        )];
        notes.extend(report.months.iter().map(|month| {
            format!(
                "{}: {} days, mean {:.2}, min {:.2}, max {:.2}",
                month.month,
                month.days.len(),
                month.mean,
                month.min,
                month.max
            )
        }));
        if let Some(trend) = &report.trend {
            notes.push(format!(
                "{} days from {} to {}: mean {:.2}, min {:.2}, max {:.2}, trend {:+.3} per day ({:+.2} over the period)",
                trend.day_count,
                trend.date_range.0,
                trend.date_range.1,
                trend.average_vo2max,
                trend.min_vo2max,
                trend.max_vo2max,
                trend.trend_slope,
                trend.projected_change()
            ));
        }

        let mut summary = RunSummary {
            stats,
            rows: sheet.len(),
            ..RunSummary::default()
        };
        summary.absorb(&vo2);

        Ok(ReportOutput {
            kind: ReportKind::Vo2Max,
            sheets: vec![sheet, by_month],
            notes,
            summary,
        })
    }

    fn run_weight_vo2(&self) -> Result<ReportOutput> {
        let mut vo2 = TableBuilder::<Vo2MaxReading>::new();
        let mut weight = TableBuilder::<BodyMassReading>::new();
        let stats = self.scan(
            self.selector().records([VO2_MAX_TYPE, BODY_MASS_TYPE]),
            &mut [&mut vo2, &mut weight],
        )?;
        let (vo2, weight) = (vo2.build(), weight.build());
        if vo2.is_empty() {
            return Err(no_data(ReportKind::WeightVo2, "the export holds no VO2max records"));
        }
        if weight.is_empty() {
            warn!("No body mass records; every row will have an empty weight");
        }

        let report = correlate_weight_vo2(
            &vo2,
            &weight,
            self.config.vo2max.daily_reduction,
            self.config.vo2max.lookback_days,
        );

        let mut sheet = ReportTable::new(
            ReportKind::WeightVo2.name(),
            "Weight_vs_VO2",
            ReportKind::WeightVo2.title(),
            &[
                "Date",
                "VO2max",
                "Weight (kg)",
                "Weight date",
                "Days from start",
                "Weight change (kg)",
                "VO2max change",
                "VO2max gain per kg lost",
            ],
        );
        for row in &report.rows {
            sheet.push_row(vec![
                Cell::Date(row.date),
                Cell::number(row.vo2max, 2),
                Cell::opt_number(row.weight_kg, 2),
                row.weight_date.map_or(Cell::Empty, Cell::Date),
                Cell::Integer(row.days_from_start),
                Cell::opt_number(row.weight_delta_kg, 2),
                Cell::number(row.vo2_delta, 2),
                Cell::opt_number(row.vo2_gain_per_kg_lost, 3),
            ]);
        }

        let mut notes = vec![format!(
            "{} of {} days matched a weight within {} days",
            report.matched_rows(),
            report.rows.len(),
            report.lookback_days
        )];
        notes.push(match report.correlation {
            Some(r) => format!("Pearson r (VO2max vs weight): {:.3}", r),
            None => format!(
                "Correlation needs at least {} days with both values",
                MIN_CORRELATION_ROWS
            ),
        });

        let mut summary = RunSummary {
            stats,
            rows: sheet.len(),
            ..RunSummary::default()
        };
        summary.absorb(&vo2);
        summary.absorb(&weight);

        Ok(ReportOutput {
            kind: ReportKind::WeightVo2,
            sheets: vec![sheet],
            notes,
            summary,
        })
    }

    /// Workouts and, unless `workouts_only`, ambient distance in one scan
    fn scan_daily_walking(&self, workouts_only: bool) -> Result<(Vec<DailyWalk>, RunSummary)> {
        let mut workouts = TableBuilder::<WalkingWorkout>::new();
        let mut ambient = TableBuilder::<DistanceSample>::new();

        let stats = if workouts_only {
            self.scan(self.walking_selector(), &mut [&mut workouts])?
        } else {
            self.scan(
                self.walking_selector()
                    .records(self.config.walking.distance_types.iter()),
                &mut [&mut workouts, &mut ambient],
            )?
        };
        let (workouts, ambient) = (workouts.build(), ambient.build());

        let mut summary = RunSummary {
            stats,
            ..RunSummary::default()
        };
        summary.absorb(&workouts);
        summary.absorb(&ambient);

        Ok((daily_walking(&workouts, &ambient), summary))
    }

    fn run_weekly_walks(&self) -> Result<ReportOutput> {
        let (daily, mut summary) = self.scan_daily_walking(true)?;
        let weeks = weekly_workouts(&daily);
        if weeks.is_empty() {
            return Err(no_data(ReportKind::WeeklyWalks, "the export holds no walking workouts"));
        }

        let mut sheet = ReportTable::new(
            ReportKind::WeeklyWalks.name(),
            "Walks_by_week",
            ReportKind::WeeklyWalks.title(),
            &[
                "Week",
                "First day",
                "Last day",
                "Workouts",
                "Distance (km)",
                "Duration (min)",
                "Hours",
                "Pace (min/km)",
            ],
        );
        for week in &weeks {
            sheet.push_row(vec![
                week_cell(week.week),
                Cell::Date(week.first_day),
                Cell::Date(week.last_day),
                Cell::Integer(week.workouts as i64),
                Cell::number(week.distance_km, 2),
                Cell::number(week.duration_minutes, 1),
                Cell::number(week.hours(), 2),
                Cell::opt_number(week.pace_min_per_km(), 2),
            ]);
        }
        summary.rows = sheet.len();

        let total_km: f64 = weeks.iter().map(|w| w.distance_km).sum();
        let notes = vec![format!("{} weeks, {:.2} km of walking workouts", weeks.len(), total_km)];

        Ok(ReportOutput {
            kind: ReportKind::WeeklyWalks,
            sheets: vec![sheet],
            notes,
            summary,
        })
    }

    fn run_daily_walk(&self) -> Result<ReportOutput> {
        let (daily, mut summary) = self.scan_daily_walking(false)?;
        if daily.is_empty() {
            return Err(no_data(
                ReportKind::DailyWalk,
                "the export holds no walking workouts or distance samples",
            ));
        }

        let sheet = daily_sheet(&daily);
        summary.rows = sheet.len();

        let total: f64 = daily.iter().map(|d| d.total_km).sum();
        let non_workout: f64 = daily.iter().map(|d| d.non_workout_km).sum();
        let notes = vec![format!(
            "{} days, {:.2} km in total, {:.2} km outside workouts",
            daily.len(),
            total,
            non_workout
        )];

        Ok(ReportOutput {
            kind: ReportKind::DailyWalk,
            sheets: vec![sheet],
            notes,
            summary,
        })
    }

    fn weekly_from_daily_output(&self, daily: &[DailyWalk], mut summary: RunSummary) -> Result<ReportOutput> {
        let weeks = weekly_from_daily(daily);
        if weeks.is_empty() {
            return Err(no_data(ReportKind::WeeklyFromDaily, "there are no daily walking rows"));
        }

        let mut sheet = ReportTable::new(
            ReportKind::WeeklyFromDaily.name(),
            "Weekly_walking",
            ReportKind::WeeklyFromDaily.title(),
            &[
                "Week",
                "First day",
                "Last day",
                "Days",
                "Total km",
                "Workout km",
                "Non-workout km",
                "Avg km/day",
                "Avg non-workout km/day",
                "Non-workout %",
            ],
        );
        for week in &weeks {
            sheet.push_row(vec![
                week_cell(week.week),
                Cell::Date(week.first_day),
                Cell::Date(week.last_day),
                Cell::Integer(week.days_with_data as i64),
                Cell::number(week.total_km, 2),
                Cell::number(week.workout_km, 2),
                Cell::number(week.non_workout_km, 2),
                Cell::number(week.avg_total_km_per_day(), 2),
                Cell::number(week.avg_non_workout_km_per_day(), 2),
                Cell::opt_number(week.non_workout_share_percent(), 1),
            ]);
        }
        summary.rows = sheet.len();

        Ok(ReportOutput {
            kind: ReportKind::WeeklyFromDaily,
            sheets: vec![sheet],
            notes: vec![format!("{} weeks from {} days", weeks.len(), daily.len())],
            summary,
        })
    }

    fn run_last_walk(&self) -> Result<ReportOutput> {
        let mut workouts = TableBuilder::<WalkingWorkout>::new();
        let mut stats = self.scan(self.walking_selector(), &mut [&mut workouts])?;
        let workouts = workouts.build();
        let workout = latest_workout(&workouts)?;
        info!("Latest walk started {}", workout.start);

        // Second pass over a fresh reader for the samples recorded during the walk
        let mut heart_rate = TableBuilder::<HeartRateSample>::new();
        let mut distances = TableBuilder::<DistanceSample>::new();
        let sample_selector = Selector::new()
            .records(
                std::iter::once(HEART_RATE_TYPE.to_string())
                    .chain(self.config.walking.distance_types.iter().cloned()),
            )
            .source_containing(self.config.walking.source_filter.as_deref())
            .overlapping(workout.start, workout.end);
        let sample_stats = self.scan(sample_selector, &mut [&mut heart_rate, &mut distances])?;
        stats.merge(&sample_stats);
        let (heart_rate, distances) = (heart_rate.build(), distances.build());

        if heart_rate.is_empty() {
            warn!("No heart rate samples during the latest walk");
        }

        let report = build_last_walk_report(
            workout,
            &heart_rate,
            &distances,
            &self.config.zones,
            self.config.walking.split_tolerance_km,
        );

        let summary_sheet = last_walk_summary_sheet(&report);
        let splits_sheet = last_walk_splits_sheet(&report);

        let mut notes = vec![format!(
            "{} heart rate samples, {} distance samples ({:?})",
            report.heart_rate_samples, report.distance_samples, report.distance_mode
        )];
        if report.splits.is_empty() {
            notes.push("No distance recorded; splits are unavailable".to_string());
        }

        let mut summary = RunSummary {
            stats,
            rows: splits_sheet.len(),
            ..RunSummary::default()
        };
        summary.absorb(&workouts);
        summary.absorb(&heart_rate);
        summary.absorb(&distances);

        Ok(ReportOutput {
            kind: ReportKind::LastWalk,
            sheets: vec![summary_sheet, splits_sheet],
            notes,
            summary,
        })
    }
}

const VO2MAX_BY_MONTH: &str = "vo2max_by_month";
const LAST_WALK_SUMMARY: &str = "last_walk_summary";
const LAST_WALK_SPLITS: &str = "last_walk_splits";

fn no_data(kind: ReportKind, reason: &str) -> HealthRsError {
    HealthRsError::NoData {
        report: kind.name().to_string(),
        reason: reason.to_string(),
    }
}

fn week_cell(week: IsoWeekKey) -> Cell {
    Cell::text(week.to_string())
}

/// Daily walking sheet; its layout is what [`daily_from_sheet`] reads back
pub fn daily_sheet(daily: &[DailyWalk]) -> ReportTable {
    let mut sheet = ReportTable::new(
        ReportKind::DailyWalk.name(),
        "Daily_walking",
        ReportKind::DailyWalk.title(),
        &DAILY_HEADERS,
    );
    for day in daily {
        sheet.push_row(vec![
            Cell::Date(day.date),
            Cell::number(day.total_km, 3),
            Cell::number(day.workout_km, 3),
            Cell::number(day.non_workout_km, 3),
            Cell::Integer(day.workouts as i64),
            Cell::number(day.workout_minutes, 1),
        ]);
    }
    sheet
}

fn last_walk_summary_sheet(report: &LastWalkReport) -> ReportTable {
    let workout = &report.workout;
    let mut sheet = ReportTable::new(
        LAST_WALK_SUMMARY,
        "Summary",
        ReportKind::LastWalk.title(),
        &["Metric", "Value", "Share %"],
    );

    let mut row = |metric: &str, value: Cell| {
        sheet.push_row(vec![Cell::text(metric), value, Cell::Empty]);
    };
    row("Start", Cell::DateTime(workout.start));
    row("End", Cell::DateTime(workout.end));
    row(
        "Activity",
        Cell::text(
            workout
                .activity_type
                .trim_start_matches("HKWorkoutActivityType")
                .to_string(),
        ),
    );
    row(
        "Source",
        workout.source_name.as_deref().map_or(Cell::Empty, Cell::text),
    );
    row("Distance (km)", Cell::opt_number(workout.distance_km, 2));
    row(
        "Elapsed",
        Cell::text(format_hms(report.elapsed().num_milliseconds() as f64 / 1000.0)),
    );
    row(
        "Moving time",
        Cell::text(format_hms(report.moving_time().num_milliseconds() as f64 / 1000.0)),
    );
    row(
        "Average pace",
        report
            .avg_pace_sec_per_km()
            .map_or(Cell::Empty, |p| Cell::text(format_pace(p))),
    );
    row("Average HR (bpm)", Cell::opt_number(report.avg_hr, 2));
    row("Active kcal", Cell::opt_number(workout.active_kcal, 0));
    row("Total kcal", Cell::opt_number(workout.total_kcal(), 0));
    row("Elevation gain (m)", Cell::opt_number(workout.elevation_gain_m, 1));

    for zone in 1..=ZONE_COUNT as u8 {
        let seconds = report.time_in_zones.seconds[zone as usize - 1];
        sheet.push_row(vec![
            Cell::text(format!("Zone {} ({})", zone, report.zones.range_label(zone))),
            Cell::text(format_hms(seconds)),
            Cell::number(report.time_in_zones.percent(zone), 1),
        ]);
    }
    sheet
}

fn last_walk_splits_sheet(report: &LastWalkReport) -> ReportTable {
    let mut sheet = ReportTable::new(
        LAST_WALK_SPLITS,
        "Splits",
        "Latest walk splits",
        &["Split", "Distance (km)", "End time", "Duration", "Pace", "Avg HR (bpm)"],
    );
    for split in &report.splits {
        sheet.push_row(vec![
            Cell::Integer(split.index as i64),
            Cell::number(split.length_km, 2),
            Cell::Time(split.end_time.time()),
            Cell::text(format_hms(split.duration_seconds)),
            Cell::text(format_pace(split.pace_sec_per_km())),
            Cell::opt_number(split.avg_hr, 2),
        ]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_report_names_are_unique() {
        let mut names: Vec<&str> = ReportKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ReportKind::ALL.len());
    }

    #[test]
    fn test_daily_sheet_reads_back() {
        let daily = vec![DailyWalk {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            total_km: 2.8,
            workout_km: 2.0,
            non_workout_km: 0.8,
            workouts: 1,
            workout_minutes: 30.0,
        }];
        let sheet = daily_sheet(&daily);
        let data = crate::export::csv::SheetData {
            headers: sheet.headers.clone(),
            rows: sheet
                .rows
                .iter()
                .map(|r| r.iter().map(|c| c.display()).collect())
                .collect(),
        };
        assert_eq!(daily_from_sheet(&data).unwrap(), daily);
    }

    #[test]
    fn test_summary_line() {
        let summary = RunSummary {
            rows: 3,
            dropped: 1,
            ..RunSummary::default()
        };
        let line = summary.to_string();
        assert!(line.starts_with("3 rows"));
        assert!(line.contains("dropped 1"));
    }
}
