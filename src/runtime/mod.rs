//! Runtime support
//!
//! The object model the argument frames need:
//! - Objects with internal fields, arrays, functions and function templates
//! - Strings
//! - Numbers (small integers and boxed doubles)

pub mod array;
pub mod function;
pub mod number;
pub mod object;
pub mod string;

pub use array::{MAX_ARRAY_LENGTH, allocate_array, array_get, array_length, is_array};
pub use function::{allocate_function, allocate_function_template, is_function, is_function_template};
pub use number::{is_number, new_number, number_value};
pub use object::{ClassId, HeapObject, allocate_object, class_of, is_receiver};
pub use string::{allocate_string, is_string, to_rust_string};
