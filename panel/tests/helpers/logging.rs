use std::sync::Mutex;
use std::time::Instant;

/// Step logger for integration tests. Lines go to stderr and are kept for
/// dumping when an assertion fails.
pub struct TestLogger {
    test_name: String,
    start: Instant,
    step: Mutex<usize>,
    lines: Mutex<Vec<String>>,
}

impl TestLogger {
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            test_name: test_name.to_string(),
            start: Instant::now(),
            step: Mutex::new(0),
            lines: Mutex::new(Vec::new()),
        };
        logger.log("start");
        logger
    }

    pub fn step(&self, description: &str) {
        let step = {
            let mut step = self.step.lock().unwrap();
            *step += 1;
            *step
        };
        self.log(&format!("STEP {step}: {description}"));
    }

    pub fn log(&self, msg: &str) {
        let line = format!(
            "[{:.3}s] [{}] {}",
            self.start.elapsed().as_secs_f64(),
            self.test_name,
            msg
        );
        eprintln!("{line}");
        self.lines.lock().unwrap().push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Drop for TestLogger {
    fn drop(&mut self) {
        eprintln!(
            "[{:.3}s] [{}] end",
            self.start.elapsed().as_secs_f64(),
            self.test_name
        );
    }
}
