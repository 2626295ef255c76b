use crate::types::AnalysisRecord;

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Format an analysis record as human-readable markdown
pub fn format_record_readable(record: &AnalysisRecord) -> String {
    let mut output = String::new();

    let title = match record.filename() {
        "" => "Untitled video",
        name => name,
    };
    output.push_str(&format!("# {}\n\n", title));

    output.push_str("## Video Information\n\n");
    output.push_str(&format!(
        "**Duration:** {:.0} seconds ({}) | **Resolution:** {} | **FPS:** {}\n\n",
        record.duration().round(),
        format_timestamp(record.duration()),
        record.resolution(),
        record.fps()
    ));

    if record.transcript().is_none() {
        output.push_str("> No transcript was generated for this video. This could be due to:\n");
        output.push_str(">  • The video has no audio track\n");
        output.push_str(">  • The audio quality is too low\n");
        output.push_str(">  • The video format is not supported for transcription\n\n");
        return output;
    }

    if let Some(summaries) = record.summaries() {
        output.push_str("## Summary\n\n");
        output.push_str(&summaries.paragraph_summary);
        output.push_str("\n\n");

        for (title, items) in [
            ("Key Points", &summaries.key_points),
            ("Decisions", &summaries.decisions),
            ("Action Items", &summaries.action_items),
        ] {
            output.push_str(&format!("## {}\n\n", title));
            for item in items {
                output.push_str(&format!("• {}\n", item));
            }
            output.push('\n');
        }
    }

    if let Some(timestamps) = record.timestamps() {
        output.push_str("## Transcript with Timestamps\n\n");
        for entry in timestamps {
            output.push_str(&format!("[{}] {}\n", entry.timestamp, entry.text.trim()));
        }
        output.push('\n');
    }

    output
}
