use phish_sentinel::audit::{AuditSink, JsonLineSink, Rotation};
use phish_sentinel::demo::run_demo;
use std::sync::Arc;

fn main() {
    env_logger::init();

    let sink: Arc<dyn AuditSink> = match JsonLineSink::open("detections.log", Rotation::default()) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            eprintln!("Cannot open audit log: {e}");
            std::process::exit(1);
        }
    };

    let report = run_demo(sink.clone(), 0.6);

    println!("🔗 URL analysis: {:#?}", report.url);
    match &report.url_alert {
        Some(alert) => println!("🚨 Generated alert:\n{}", to_json(alert)),
        None => println!("   score {:.2} below threshold, no alert", report.url.suspicion_score),
    }
    println!();

    println!("📧 Email analysis: {:#?}", report.email);
    match &report.email_alert {
        Some(alert) => println!("🚨 Generated alert:\n{}", to_json(alert)),
        None => println!("   score {:.2} below threshold, no alert", report.email.suspicion_score),
    }

    sink.flush();
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}
