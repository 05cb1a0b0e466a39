//! Text editing surface for the terminal editor.

mod textarea;

pub use textarea::{Cursor, Direction, TextArea};
