#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use kix::config::{Config, UnusedVariables};
use kix::session::Session;

/// In-memory writer that can be handed to a session and read back later.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Accepts writes but fails every flush, like a closed pipe.
#[derive(Clone, Default)]
pub struct UnflushableBuffer(pub SharedBuffer);

impl Write for UnflushableBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

pub struct Harness {
    pub session: Session,
    pub out: SharedBuffer,
    pub err: SharedBuffer,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let session = Session::with_streams(config, Box::new(out.clone()), Box::new(err.clone()));

        Self { session, out, err }
    }

    pub fn run(&mut self, source: &str) -> &mut Self {
        self.session.run(source);
        self
    }
}

/// Run `source` as one script with the default configuration.
/// Returns (stdout, stderr, exit code).
pub fn run(source: &str) -> (String, String, i32) {
    run_with(source, Config::default())
}

pub fn run_with(source: &str, config: Config) -> (String, String, i32) {
    let mut harness = Harness::new(config);
    harness.run(source);

    (
        harness.out.contents(),
        harness.err.contents(),
        harness.session.exit_code(),
    )
}

pub fn strict() -> Config {
    Config {
        unused_variables: UnusedVariables::Error,
        ..Config::default()
    }
}
