use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use sic::{EnvId, Interpreter};

/// An output sink the test keeps a handle to.
#[derive(Clone, Default)]
pub struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn interpreter() -> (Interpreter, Captured) {
    let out = Captured::default();
    (Interpreter::with_output(Box::new(out.clone())), out)
}

#[allow(dead_code)]
pub fn with_root() -> (Interpreter, EnvId, Captured) {
    let (mut interp, out) = interpreter();
    let root = interp.new_root_context();
    (interp, root, out)
}
