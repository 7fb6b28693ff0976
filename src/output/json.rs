use crate::jobs::Job;
use crate::output::OutputResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serializes a Job, including its report, as pretty-printed JSON
pub fn format_json_report(job: &Job) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(job)?)
}

/// Writes the JSON form of a Job to a file
pub fn write_json_report(job: &Job, output_path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, job)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
