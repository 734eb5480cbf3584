#![allow(clippy::module_inception)]

use std::{fmt::Display, rc::Rc};

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::errors::{Error, ErrorTip};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod macros;
pub mod type_checker;

extern crate regex;

lazy_static! {
    static ref LOCATION_PATTERN: Regex = Regex::new(r"^(?P<file>.+):(?P<line>\d+)$").unwrap();
}

/// Source location of a node: line number and file name.
#[derive(Debug, Clone, PartialEq)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }

    /// Parses the `file:line` form the parser attaches to every node.
    pub fn parse(location: &str) -> Option<Self> {
        let captures = LOCATION_PATTERN.captures(location.trim())?;
        let line = captures["line"].parse::<u32>().ok()?;

        Some(Position(line, Rc::new(captures["file"].to_string())))
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.1, self.0)
    }
}

pub fn format_error(error: &Error) -> String {
    /*
        Error: name (tip)
        -> file.rbx:20
    */

    let mut output = if let ErrorTip::None = error.get_tip() {
        format!("Error: {}\n", error.get_error_name())
    } else {
        format!("Error: {} ({})\n", error.get_error_name(), error.get_tip())
    };
    output.push_str(&format!("-> {}\n", error.get_position()));

    output
}
