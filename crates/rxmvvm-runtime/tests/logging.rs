#![forbid(unsafe_code)]

//! Log output of the runtime, captured through a `tracing-subscriber` writer.

use std::io;
use std::sync::{Arc, Mutex};

use rxmvvm_runtime::{ReactiveConfig, ReactiveFactory, Subject};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn captured(run: impl FnOnce()) -> String {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, run);
    capture.text()
}

#[test]
fn command_lifecycle_is_logged_at_debug() {
    let logs = captured(|| {
        let command = ReactiveFactory::new().command().from_supplier(|| 1);
        let _run = command.execute().subscribe(|_| {});
    });
    assert!(logs.contains("command execution admitted"));
    assert!(logs.contains("command_execute"));
    assert!(logs.contains("command execution settled"));
}

#[test]
fn rejections_follow_the_config_flag() {
    let reject = |config: ReactiveConfig| {
        captured(move || {
            let gate = Subject::replaying(false);
            let command = ReactiveFactory::from_config(&config)
                .command()
                .can_execute(gate.as_observable())
                .from_action(|| {});
            let _run = command.execute().subscribe(|_| {});
        })
    };

    let logged = reject(ReactiveConfig::default());
    assert!(logged.contains("command execution rejected"));

    let quiet = reject(ReactiveConfig {
        log_rejections: false,
        ..ReactiveConfig::default()
    });
    assert!(!quiet.contains("command execution rejected"));
}

#[test]
fn unhandled_interaction_is_a_warning() {
    let logs = captured(|| {
        let interaction = ReactiveFactory::new().interaction::<String, bool>();
        assert!(interaction.invoke(Some("save?".into()), |_| {}).is_err());
    });
    assert!(logs.contains("WARN"));
    assert!(logs.contains("interaction invoked with no handler"));
}

#[test]
fn success_path_stays_below_info() {
    let logs = captured(|| {
        let factory = ReactiveFactory::new();
        let property = factory.property_with(1);
        let _sub = rxmvvm_runtime::ReactiveProperty::as_observable(&property).subscribe(|_| {});
        let command = factory.command().from_supplier(|| 2);
        let _run = command.execute().subscribe(|_| {});
    });
    assert!(!logs.contains("INFO"));
    assert!(!logs.contains("WARN"));
}
