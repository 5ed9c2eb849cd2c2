//! Persisted program format: one character per node in preorder, with no delimiters. The
//! arity of each command tells the decoder how many subtrees follow it, so a single corrupt
//! character desynchronizes the rest of the stream. Decoding therefore validates every
//! character and rejects streams that end early or carry trailing input.

use crate::program::{Command, Node, Program};
use std::str::FromStr;
use thiserror::Error;

/// Deepest tree the decoder accepts; tree operations recurse once per level.
pub const MAX_DECODE_DEPTH: usize = 256;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgramError {
    #[error("Invalid program encoding: unknown command '{character}' at position {position}")]
    InvalidProgramEncoding { character: char, position: usize },
    #[error("Program truncated: {missing} subtree(s) missing at end of input")]
    TruncatedProgram { missing: usize },
    #[error("Unexpected input after a complete program at position {position}")]
    TrailingInput { position: usize },
    #[error("Program encoding is empty")]
    EmptyProgram,
    #[error("Program nests deeper than {limit} levels at position {position}")]
    TooDeep { limit: usize, position: usize },
}

/// Decodes a preorder character stream into a program.
///
/// Surrounding whitespace is ignored. Nodes are assembled with an explicit stack, and inputs
/// nesting deeper than `MAX_DECODE_DEPTH` are rejected.
pub fn decode(encoded: &str) -> Result<Program, ProgramError> {
    let encoded = encoded.trim();
    // Function nodes still waiting for children
    let mut pending: Vec<(Command, Vec<Node>)> = Vec::new();
    let mut root: Option<Node> = None;

    for (position, character) in encoded.chars().enumerate() {
        if root.is_some() {
            return Err(ProgramError::TrailingInput { position });
        }
        let command = Command::from_char(character).ok_or(ProgramError::InvalidProgramEncoding {
            character,
            position,
        })?;
        if pending.len() >= MAX_DECODE_DEPTH {
            return Err(ProgramError::TooDeep {
                limit: MAX_DECODE_DEPTH,
                position,
            });
        }

        let mut completed = if command.is_function() {
            pending.push((command, Vec::with_capacity(command.arity())));
            None
        } else {
            Some(Node::leaf(command))
        };

        // Hand finished subtrees up until one lands in a parent that still needs more.
        while let Some(node) = completed.take() {
            match pending.last_mut() {
                None => root = Some(node),
                Some((parent, children)) => {
                    children.push(node);
                    if children.len() == parent.arity() {
                        if let Some((command, children)) = pending.pop() {
                            completed = Some(Node::new(command, children));
                        }
                    }
                }
            }
        }
    }

    match root {
        Some(root) => Ok(Program::new(root)),
        None if pending.is_empty() => Err(ProgramError::EmptyProgram),
        // every pending node but the outermost is itself an unfinished child of its parent
        None => Err(ProgramError::TruncatedProgram {
            missing: pending
                .iter()
                .map(|(command, children)| command.arity() - children.len())
                .sum::<usize>()
                - (pending.len() - 1),
        }),
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::generator::TreeGenerator;
    use crate::rng::create_rng;

    #[test]
    fn test_decode_nested_program() {
        let program: Program = "3FI2LRAC BA".replace(' ', "").parse().unwrap();
        assert_eq!(program.root().command(), Command::Progn3);
        assert_eq!(program.size(), 10);
        assert_eq!(program.encode(), "3FI2LRACBA");
        assert_eq!(program.depth(), 4);
    }

    #[test]
    fn test_decode_single_terminal() {
        let program = decode("A\n").unwrap();
        assert_eq!(program.size(), 1);
        assert_eq!(program.root().command(), Command::Align);
    }

    #[test]
    fn test_generated_programs_survive_persistence() {
        let mut rng = create_rng(21);
        let generator = TreeGenerator::new(8);
        for _ in 0..25 {
            let program = generator.generate_tree(&mut rng);
            let restored: Program = program.encode().parse().unwrap();
            assert_eq!(restored, program);
        }
    }

    #[test]
    fn test_unknown_character_is_rejected() {
        assert_eq!(
            decode("2FX"),
            Err(ProgramError::InvalidProgramEncoding {
                character: 'X',
                position: 2
            })
        );
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        assert_eq!(
            decode("3F2L"),
            Err(ProgramError::TruncatedProgram { missing: 2 })
        );
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        assert_eq!(
            decode("2FLR"),
            Err(ProgramError::TrailingInput { position: 3 })
        );
    }

    #[test]
    fn test_empty_stream_is_rejected() {
        assert_eq!(decode("  "), Err(ProgramError::EmptyProgram));
    }

    #[test]
    fn test_chain_at_depth_limit_decodes() {
        let functions = MAX_DECODE_DEPTH - 1;
        let encoded = format!("{}F{}", "2".repeat(functions), "L".repeat(functions));
        let program = decode(&encoded).unwrap();
        assert_eq!(program.size(), 2 * functions + 1);
        assert_eq!(program.depth(), MAX_DECODE_DEPTH);
    }

    #[test]
    fn test_chain_past_depth_limit_is_rejected() {
        let functions = 300_000;
        let encoded = format!("{}F{}", "2".repeat(functions), "L".repeat(functions));
        assert_eq!(
            decode(&encoded),
            Err(ProgramError::TooDeep {
                limit: MAX_DECODE_DEPTH,
                position: MAX_DECODE_DEPTH,
            })
        );
    }

    #[test]
    fn test_serde_uses_encoding() {
        let program = decode("IFB").unwrap();
        let json = serde_json::to_string(&program).unwrap();
        assert_eq!(json, "\"IFB\"");
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, program);
        assert!(serde_json::from_str::<Program>("\"I?B\"").is_err());
    }
}
