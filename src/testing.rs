///! Helpers shared by the unit tests.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::eval::Interpreter;

/// An output sink the test keeps a handle to after giving it away.
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

/// An interpreter whose output lands in the returned `Captured`.
pub fn capturing_interpreter() -> (Interpreter, Captured) {
    let out = Captured::default();
    (Interpreter::with_output(Box::new(out.clone())), out)
}
