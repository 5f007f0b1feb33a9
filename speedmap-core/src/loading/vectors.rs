//! Per-intersection speed statistics as space-separated text.
//!
//! Line `i` describes intersection `i`:
//! `count (edge_id mean std num_samples) x count`.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::model::{CityMap, SpeedVector};
use crate::Error;

fn field<T: std::str::FromStr>(fields: &[&str], index: usize, line: usize) -> Result<T, Error> {
    let raw = fields
        .get(index)
        .ok_or_else(|| Error::InvalidData(format!("Vector line {line} is too short")))?;
    raw.parse()
        .map_err(|_| Error::InvalidData(format!("Vector line {line}: invalid field {raw:?}")))
}

fn parse_line(record: &StringRecord, line: usize) -> Result<Vec<SpeedVector>, Error> {
    // lines written with a trailing separator carry an empty last field
    let fields: Vec<&str> = record.iter().filter(|raw| !raw.is_empty()).collect();
    let count: usize = field(&fields, 0, line)?;
    let expected = count.checked_mul(4).and_then(|values| values.checked_add(1));
    if expected != Some(fields.len()) {
        return Err(Error::InvalidData(format!(
            "Vector line {line} announces {count} vectors but has {} fields",
            fields.len()
        )));
    }
    (0..count)
        .map(|i| {
            let base = 1 + 4 * i;
            Ok(SpeedVector::restored(
                field(&fields, base, line)?,
                field(&fields, base + 1, line)?,
                field(&fields, base + 2, line)?,
                field(&fields, base + 3, line)?,
            ))
        })
        .collect()
}

/// Write the statistics of every intersection, vectors ordered by street id
pub fn save_vectors(city: &CityMap, path: &Path) -> Result<(), Error> {
    let mut writer = WriterBuilder::new()
        .delimiter(b' ')
        .flexible(true)
        .has_headers(false)
        .from_path(path)?;

    for property in city.intersection_properties() {
        let mut record = Vec::with_capacity(1 + 4 * property.len());
        record.push(property.len().to_string());
        for vector in property.vectors() {
            record.push(vector.edge_id.to_string());
            record.push(vector.speed_mean.to_string());
            record.push(vector.speed_std.to_string());
            record.push(vector.num_samples.to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Replace the statistics of `city` with those stored at `path`.
///
/// Restored vectors count every sample with weight 1. Intersections beyond
/// the end of the file are cleared.
pub fn load_vectors(city: &mut CityMap, path: &Path) -> Result<(), Error> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b' ')
        .flexible(true)
        .has_headers(false)
        .from_reader(File::open(path)?);

    let intersection_count = city.intersection_count();
    let mut global = 0u64;
    let mut restored = 0;
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let Some(property) = city.intersection_property_mut(line) else {
            log::warn!(
                "{} has more lines than the {intersection_count} intersections, ignoring the rest",
                path.display()
            );
            break;
        };
        property.restore(parse_line(&record, line + 1)?);
        global += u64::from(property.total_num_samples());
        restored += 1;
    }
    for id in restored..intersection_count {
        if let Some(property) = city.intersection_property_mut(id) {
            property.restore([]);
        }
    }
    city.set_global_sample_count(global);

    log::info!(
        "Loaded speed vectors for {restored} intersections ({global} samples) from {}",
        path.display()
    );
    Ok(())
}
