use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use phish_sentinel::alert::AlertBuilder;
use phish_sentinel::audit::{AuditSink, JsonLineSink};
use phish_sentinel::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use phish_sentinel::demo::{email_alert_request, run_demo, url_alert_request};
use phish_sentinel::{
    analyze_email, analyze_url, load_labeled_csv, retrain_and_check, ArtifactStore, Detector,
    FileArtifactStore, Trainer, TrainingReport,
};
use std::collections::HashMap;
use std::process;
use std::sync::Arc;

fn main() {
    let matches = Command::new("phish-sentinel")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing URL and email detection with explainable scores")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .help("Classify a single URL with the trained model")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("explain")
                .long("explain")
                .value_name("URL")
                .help("Show the features driving the model score for a URL")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .value_name("FILE")
                .help("Classify every URL in the 'url' column of a CSV file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("analyze-url")
                .long("analyze-url")
                .value_name("URL")
                .help("Rule-score a URL and raise an alert above the threshold")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("analyze-email")
                .long("analyze-email")
                .value_name("FILE")
                .help("Rule-score an email file (headers, blank line, body)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("train")
                .long("train")
                .value_name("FILE")
                .help("Train model artifacts from a url,label CSV file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("retrain")
                .long("retrain")
                .value_name("FILE")
                .help("Retrain from a url,label CSV file and verify the saved artifacts")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Run the sample URL and email through the rule scorers")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&matches, &config) {
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

fn run(matches: &ArgMatches, config: &Config) -> anyhow::Result<()> {
    if let Some(url) = matches.get_one::<String>("url") {
        let prediction = load_detector(config)?.predict_url(url)?;
        println!("{}", serde_json::to_string_pretty(&prediction)?);
        return Ok(());
    }

    if let Some(url) = matches.get_one::<String>("explain") {
        let explanation = load_detector(config)?.explain_url(url, config.explain_top_n)?;
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(());
    }

    if let Some(path) = matches.get_one::<String>("csv") {
        return classify_csv(config, path);
    }

    if let Some(url) = matches.get_one::<String>("analyze-url") {
        let analysis = analyze_url(url);
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        if analysis.suspicion_score >= config.alert_threshold {
            let builder = AlertBuilder::new(open_audit_sink(config)?);
            let alert = builder.make_alert(url_alert_request(&analysis, "cli"));
            println!("🚨 Generated alert:");
            println!("{}", serde_json::to_string_pretty(&alert)?);
        }
        return Ok(());
    }

    if let Some(path) = matches.get_one::<String>("analyze-email") {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading email file {path}"))?;
        let (headers, body) = parse_email(&content);
        let analysis = analyze_email(&headers, &body);
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        if analysis.suspicion_score >= config.alert_threshold {
            let builder = AlertBuilder::new(open_audit_sink(config)?);
            let alert = builder.make_alert(email_alert_request(&analysis, "cli"));
            println!("🚨 Generated alert:");
            println!("{}", serde_json::to_string_pretty(&alert)?);
        }
        return Ok(());
    }

    if let Some(path) = matches.get_one::<String>("train") {
        let samples = load_labeled_csv(path).with_context(|| format!("reading {path}"))?;
        let outcome = Trainer::new(config.training.clone()).fit(&samples)?;
        let store = FileArtifactStore::new(&config.artifact_dir);
        store.save(&outcome.artifacts)?;
        print_report(&outcome.report);
        println!("✅ Artifacts written to {}", config.artifact_dir);
        return Ok(());
    }

    if let Some(path) = matches.get_one::<String>("retrain") {
        let samples = load_labeled_csv(path).with_context(|| format!("reading {path}"))?;
        let store = FileArtifactStore::new(&config.artifact_dir);
        let report = retrain_and_check(&store, &Trainer::new(config.training.clone()), &samples)?;
        print_report(&report);
        println!("✅ Retrained artifacts reload cleanly");
        return Ok(());
    }

    if matches.get_flag("demo") {
        let sink = open_audit_sink(config)?;
        let report = run_demo(sink.clone(), config.alert_threshold);
        println!("URL analysis: {}", serde_json::to_string(&report.url)?);
        if let Some(alert) = &report.url_alert {
            println!("Generated alert:");
            println!("{}", serde_json::to_string_pretty(alert)?);
        }
        println!("Email analysis: {}", serde_json::to_string(&report.email)?);
        if let Some(alert) = &report.email_alert {
            println!("Generated alert:");
            println!("{}", serde_json::to_string_pretty(alert)?);
        }
        sink.flush();
        return Ok(());
    }

    println!("Provide --url, --csv, --explain, --analyze-url, --analyze-email, --train or --demo.");
    println!("Run with --train first if model artifacts are missing.");
    Ok(())
}

fn load_detector(config: &Config) -> anyhow::Result<Detector> {
    let store = FileArtifactStore::new(&config.artifact_dir);
    Ok(Detector::load(&store)?)
}

fn open_audit_sink(config: &Config) -> anyhow::Result<Arc<dyn AuditSink>> {
    let sink = JsonLineSink::open(&config.audit.path, config.audit.rotation())
        .with_context(|| format!("opening audit log {}", config.audit.path))?;
    Ok(Arc::new(sink))
}

fn classify_csv(config: &Config, path: &str) -> anyhow::Result<()> {
    let detector = load_detector(config)?;
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("reading {path}"))?;
    let url_column = reader
        .headers()?
        .iter()
        .position(|h| h == "url")
        .with_context(|| format!("{path} has no 'url' column"))?;

    println!("url,phishing_prob,label");
    for record in reader.records() {
        let record = record?;
        let url = record.get(url_column).unwrap_or_default();
        let prediction = detector.predict_url(url)?;
        println!(
            "{},{:.4},{}",
            prediction.url, prediction.phishing_prob, prediction.label
        );
    }
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!("📊 Training report");
    println!("   Train / test: {} / {}", report.train_size, report.test_size);
    println!("   Accuracy:  {:.4}", report.accuracy);
    println!("   Precision: {:.4}", report.precision);
    println!("   Recall:    {:.4}", report.recall);
    println!("   F1:        {:.4}", report.f1);
}

/// Split a plain `Header: value` block and body at the first blank line.
fn parse_email(content: &str) -> (HashMap<String, String>, String) {
    let mut headers: HashMap<String, String> = HashMap::new();
    let mut body = String::new();
    let mut in_headers = true;
    let mut last_header_key: Option<String> = None;

    for line in content.lines() {
        if in_headers {
            if line.trim().is_empty() {
                in_headers = false;
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(ref key) = last_header_key {
                    if let Some(existing_value) = headers.get_mut(key) {
                        existing_value.push(' ');
                        existing_value.push_str(line.trim());
                    }
                }
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_string();
                last_header_key = Some(key.clone());
                headers.insert(key, value.trim().to_string());
            }
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    (headers, body)
}

fn generate_default_config(path: &str) {
    match Config::default().to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_with_folded_header() {
        let (headers, body) = parse_email(
            "From: \"PayPal\" <a@evil.info>\nSubject: Account\n  notice\n\nVerify now!\nThanks\n",
        );
        assert_eq!(headers.get("From").unwrap(), "\"PayPal\" <a@evil.info>");
        assert_eq!(headers.get("Subject").unwrap(), "Account notice");
        assert_eq!(body, "Verify now!\nThanks\n");
    }
}
