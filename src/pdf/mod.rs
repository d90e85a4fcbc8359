//! PDF container parsing and serialization

mod dict;
mod filter;
pub(crate) mod lexer;
mod object;
mod parser;
mod stream;
mod writer;
mod xref;

pub use dict::Dictionary;
pub use filter::{Filter, PredictorParams};
pub use object::{Object, ObjectId};
pub use parser::{Document, MaterializedObject};
pub use stream::Stream;
pub use writer::DocumentWriter;
pub use xref::{ObjectIndex, XrefEntry};
