//! CLI mode for label extraction.

use crate::config::EngineConfig;
use crate::fetch::read_input;
use medbox_ocr::medbox::{MedBoxOcrBuilder, Submission, SubmissionOutcome};

/// Processes one submission from local paths or URLs and prints the record.
pub async fn run_extract(
    front: &str,
    back: Option<&str>,
    engines: &EngineConfig,
    output: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut builder = MedBoxOcrBuilder::new().strict_languages(engines.strict_languages);
    if let Some(ref dir) = engines.tessdata_dir {
        builder = builder.tessdata_dir(dir);
    }
    let orchestrator = builder.build()?;

    let mut submission = Submission::new(read_input(front).await?);
    if let Some(back) = back {
        submission = submission.with_back(read_input(back).await?);
    }

    let outcome = orchestrator.process(submission).await?;
    let response = orchestrator.response(&outcome.record);

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&response)?),
        _ => print_pretty(&outcome, &response),
    }
    Ok(())
}

fn print_pretty(outcome: &SubmissionOutcome, response: &medbox_ocr::RecordResponse) {
    println!("Image id:     {}", response.image_id);
    println!("Language:     {}", response.detected_language);
    println!("Source:       {}", response.source);
    println!("Name:         {}", display_or_dash(&response.medicine_name));
    if response.ingredients.is_empty() {
        println!("Ingredients:  -");
    } else {
        println!("Ingredients:");
        for ingredient in &response.ingredients {
            println!("  - {ingredient}");
        }
    }
    println!("Quantity:     {}", display_or_dash(&response.quantity));
    println!("Confidence:   {:.2}", response.confidence);

    for (label, side) in [("front", &outcome.front), ("back", &outcome.back)] {
        if let Some(run) = side {
            if run.fallback_region_used {
                println!("Note: {label} image used the whole-image fallback region");
            }
            if run.failed_regions > 0 {
                println!(
                    "Note: {label} image dropped {} region(s) after retries",
                    run.failed_regions
                );
            }
        }
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
