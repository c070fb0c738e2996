//! Pull parser over a health export document.
//!
//! The export is one flat `<HealthData>` element holding hundreds of thousands
//! of `<Record>` and `<Workout>` siblings, so it is read element by element with
//! a reused buffer instead of being materialized.

use std::io::BufRead;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::error::ExtractError;
use crate::models::{RawEntry, RawRecord, RawStatistic, RawWorkout};

type Attributes = Vec<(String, String)>;

/// An element start read from the buffer, owned so the buffer can be reused
enum Pending {
    Record { attrs: Attributes, has_children: bool },
    Workout { attrs: Attributes, has_children: bool },
}

/// Streams every `Record` and `Workout` element of an export as a [`RawEntry`].
///
/// Single pass: once exhausted (or after the first XML error) the iterator
/// only yields `None`; reopen the file to scan again.
pub struct HealthExportReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    child_buf: Vec<u8>,
    progress: ProgressBar,
    scanned: u64,
    finished: bool,
}

impl<R: BufRead> HealthExportReader<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        Self {
            reader,
            buf: Vec::with_capacity(1024),
            child_buf: Vec::with_capacity(256),
            progress: ProgressBar::hidden(),
            scanned: 0,
            finished: false,
        }
    }

    /// Show a spinner with the number of scanned elements on stderr
    pub fn with_progress(mut self, label: &str) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {msg}: {pos} elements ({per_sec})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let progress = ProgressBar::new_spinner();
        progress.set_style(style);
        progress.set_message(label.to_string());
        progress.enable_steady_tick(Duration::from_millis(120));
        self.progress = progress;
        self
    }

    /// Number of `Record` and `Workout` elements read so far
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    fn finish(&mut self) {
        self.finished = true;
        self.progress.finish_and_clear();
    }

    fn next_pending(&mut self) -> Result<Option<Pending>, ExtractError> {
        loop {
            self.buf.clear();
            let pending = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => pending_from(&e, true),
                Ok(Event::Empty(e)) => pending_from(&e, false),
                Ok(Event::Eof) => return Ok(None),
                Ok(_) => continue,
                Err(e) => Err(e),
            };

            match pending {
                Ok(Some(p)) => return Ok(Some(p)),
                Ok(None) => continue,
                Err(e) => return Err(xml_error(self.reader.buffer_position(), e)),
            }
        }
    }

    fn skip_record_children(&mut self) -> Result<(), ExtractError> {
        self.child_buf.clear();
        match self
            .reader
            .read_to_end_into(QName(b"Record"), &mut self.child_buf)
        {
            Ok(_) => Ok(()),
            Err(quick_xml::Error::UnexpectedEof(_)) => Err(ExtractError::UnexpectedEof {
                element: "Record".to_string(),
            }),
            Err(e) => Err(xml_error(self.reader.buffer_position(), e)),
        }
    }

    /// Reads up to the closing `</Workout>`, keeping statistics and metadata
    /// that sit directly under the workout
    fn collect_workout_children(&mut self, workout: &mut RawWorkout) -> Result<(), ExtractError> {
        let mut depth = 0usize;
        loop {
            self.child_buf.clear();
            let child = match self.reader.read_event_into(&mut self.child_buf) {
                Ok(Event::Start(e)) => {
                    depth += 1;
                    if depth == 1 {
                        workout_child(&e)
                    } else {
                        Ok(None)
                    }
                }
                Ok(Event::Empty(e)) => {
                    if depth == 0 {
                        workout_child(&e)
                    } else {
                        Ok(None)
                    }
                }
                Ok(Event::End(_)) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                    Ok(None)
                }
                Ok(Event::Eof) => {
                    return Err(ExtractError::UnexpectedEof {
                        element: "Workout".to_string(),
                    })
                }
                Ok(_) => Ok(None),
                Err(e) => Err(e),
            };

            match child {
                Ok(Some(WorkoutChild::Statistic(stat))) => workout.statistics.push(stat),
                Ok(Some(WorkoutChild::Metadata(key, value))) => workout.metadata.push((key, value)),
                Ok(None) => {}
                Err(e) => return Err(xml_error(self.reader.buffer_position(), e)),
            }
        }
    }

    fn read_entry(&mut self) -> Result<Option<RawEntry>, ExtractError> {
        let Some(pending) = self.next_pending()? else {
            return Ok(None);
        };

        self.scanned += 1;
        self.progress.inc(1);

        match pending {
            Pending::Record { attrs, has_children } => {
                if has_children {
                    self.skip_record_children()?;
                }
                Ok(Some(RawEntry::Record(record_from(attrs))))
            }
            Pending::Workout { attrs, has_children } => {
                let mut workout = workout_from(attrs);
                if has_children {
                    self.collect_workout_children(&mut workout)?;
                }
                Ok(Some(RawEntry::Workout(workout)))
            }
        }
    }
}

impl<R: BufRead> Iterator for HealthExportReader<R> {
    type Item = Result<RawEntry, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

fn xml_error(position: usize, source: quick_xml::Error) -> ExtractError {
    ExtractError::Xml { position, source }
}

enum WorkoutChild {
    Statistic(RawStatistic),
    Metadata(String, String),
}

fn owned_attributes(element: &BytesStart) -> Result<Attributes, quick_xml::Error> {
    let mut attrs = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn pending_from(element: &BytesStart, has_children: bool) -> Result<Option<Pending>, quick_xml::Error> {
    match element.name().as_ref() {
        b"Record" => Ok(Some(Pending::Record {
            attrs: owned_attributes(element)?,
            has_children,
        })),
        b"Workout" => Ok(Some(Pending::Workout {
            attrs: owned_attributes(element)?,
            has_children,
        })),
        _ => Ok(None),
    }
}

fn workout_child(element: &BytesStart) -> Result<Option<WorkoutChild>, quick_xml::Error> {
    match element.name().as_ref() {
        b"WorkoutStatistics" => {
            let mut stat = RawStatistic::default();
            for (key, value) in owned_attributes(element)? {
                match key.as_str() {
                    "type" => stat.statistic_type = value,
                    "sum" => stat.sum = Some(value),
                    "unit" => stat.unit = Some(value),
                    _ => {}
                }
            }
            Ok(Some(WorkoutChild::Statistic(stat)))
        }
        b"MetadataEntry" => {
            let mut key = None;
            let mut value = None;
            for (k, v) in owned_attributes(element)? {
                match k.as_str() {
                    "key" => key = Some(v),
                    "value" => value = Some(v),
                    _ => {}
                }
            }
            Ok(key.map(|k| WorkoutChild::Metadata(k, value.unwrap_or_default())))
        }
        _ => Ok(None),
    }
}

fn record_from(attrs: Attributes) -> RawRecord {
    let mut record = RawRecord::default();
    for (key, value) in attrs {
        match key.as_str() {
            "type" => record.record_type = value,
            "sourceName" => record.source_name = Some(value),
            "device" => record.device = Some(value),
            "unit" => record.unit = Some(value),
            "value" => record.value = Some(value),
            "startDate" => record.start_date = Some(value),
            "endDate" => record.end_date = Some(value),
            _ => {}
        }
    }
    record
}

fn workout_from(attrs: Attributes) -> RawWorkout {
    let mut workout = RawWorkout::default();
    for (key, value) in attrs {
        match key.as_str() {
            "workoutActivityType" => workout.activity_type = value,
            "sourceName" => workout.source_name = Some(value),
            "device" => workout.device = Some(value),
            "duration" => workout.duration = Some(value),
            "durationUnit" => workout.duration_unit = Some(value),
            "totalDistance" => workout.total_distance = Some(value),
            "totalDistanceUnit" => workout.total_distance_unit = Some(value),
            "totalEnergyBurned" => workout.total_energy_burned = Some(value),
            "totalEnergyBurnedUnit" => workout.total_energy_burned_unit = Some(value),
            "startDate" => workout.start_date = Some(value),
            "endDate" => workout.end_date = Some(value),
            _ => {}
        }
    }
    workout
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE HealthData>
<HealthData locale="en_US">
 <ExportDate value="2024-02-01 10:00:00 +0100"/>
 <Me HKCharacteristicTypeIdentifierDateOfBirth=""/>
 <Record type="HKQuantityTypeIdentifierVO2Max" sourceName="Apple Watch" unit="mL/min·kg" creationDate="2024-01-01 09:00:00 +0100" startDate="2024-01-01 09:00:00 +0100" endDate="2024-01-01 09:00:00 +0100" value="42"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Apple Watch" unit="count/min" startDate="2024-01-01 09:00:00 +0100" endDate="2024-01-01 09:00:00 +0100" value="88">
  <MetadataEntry key="HKMetadataKeyHeartRateMotionContext" value="0"/>
 </Record>
 <Workout workoutActivityType="HKWorkoutActivityTypeWalking" duration="30" durationUnit="min" sourceName="Tom&apos;s Apple Watch" startDate="2024-01-01 10:00:00 +0100" endDate="2024-01-01 10:30:00 +0100">
  <MetadataEntry key="HKElevationAscended" value="1500 cm"/>
  <WorkoutEvent type="HKWorkoutEventTypeSegment" date="2024-01-01 10:00:00 +0100">
   <MetadataEntry key="nested" value="ignored"/>
  </WorkoutEvent>
  <WorkoutStatistics type="HKQuantityTypeIdentifierDistanceWalkingRunning" startDate="2024-01-01 10:00:00 +0100" endDate="2024-01-01 10:30:00 +0100" sum="2" unit="km"/>
  <WorkoutRoute sourceName="Apple Watch">
   <FileReference path="/workout-routes/route.gpx"/>
  </WorkoutRoute>
 </Workout>
 <Record type="HKQuantityTypeIdentifierBodyMass" sourceName="Scale" unit="kg" startDate="2024-01-02 08:00:00 +0100" endDate="2024-01-02 08:00:00 +0100" value="81.5"/>
</HealthData>
"#;

    fn read_all(doc: &str) -> Vec<Result<RawEntry, ExtractError>> {
        HealthExportReader::new(doc.as_bytes()).collect()
    }

    #[test]
    fn test_streams_records_and_workouts_in_order() {
        let entries: Vec<RawEntry> = read_all(DOC).into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 4);

        match &entries[0] {
            RawEntry::Record(r) => {
                assert_eq!(r.record_type, "HKQuantityTypeIdentifierVO2Max");
                assert_eq!(r.value.as_deref(), Some("42"));
                assert_eq!(r.unit.as_deref(), Some("mL/min·kg"));
                assert_eq!(r.start_date.as_deref(), Some("2024-01-01 09:00:00 +0100"));
            }
            other => panic!("expected record, got {:?}", other),
        }

        assert!(matches!(&entries[1], RawEntry::Record(r) if r.value.as_deref() == Some("88")));
        assert!(matches!(&entries[3], RawEntry::Record(r) if r.source_name.as_deref() == Some("Scale")));
    }

    #[test]
    fn test_workout_children_collected() {
        let entries: Vec<RawEntry> = read_all(DOC).into_iter().map(|e| e.unwrap()).collect();
        let RawEntry::Workout(workout) = &entries[2] else {
            panic!("expected workout");
        };

        assert_eq!(workout.activity_type, "HKWorkoutActivityTypeWalking");
        assert_eq!(workout.source_name.as_deref(), Some("Tom's Apple Watch"));
        assert_eq!(workout.statistics.len(), 1);
        assert_eq!(workout.statistics[0].sum.as_deref(), Some("2"));
        assert_eq!(
            workout.metadata,
            vec![("HKElevationAscended".to_string(), "1500 cm".to_string())]
        );
    }

    #[test]
    fn test_scanned_count() {
        let mut reader = HealthExportReader::new(DOC.as_bytes());
        for entry in reader.by_ref() {
            entry.unwrap();
        }
        assert_eq!(reader.scanned(), 4);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        let doc = r#"<HealthData><Record type="a" value="1"/><Record type="b" value="2"></Workout></HealthData>"#;
        let results = read_all(doc);
        assert!(results[0].is_ok());
        assert!(results.iter().any(|r| matches!(r, Err(ExtractError::Xml { .. }))));
        assert!(results.last().unwrap().is_err());
    }

    #[test]
    fn test_truncated_workout() {
        let doc = r#"<HealthData><Workout workoutActivityType="HKWorkoutActivityTypeWalking"><WorkoutStatistics type="x" sum="1"/>"#;
        let results = read_all(doc);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(ExtractError::UnexpectedEof { .. }) | Err(ExtractError::Xml { .. })
        ));
    }
}
