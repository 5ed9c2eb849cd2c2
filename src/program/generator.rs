use crate::program::{Command, Node, Program};
use rand::seq::IndexedRandom;
use rand::Rng;

/// Builds random program trees bounded by a maximum depth.
///
/// The root of a full tree is always a function. Below it, every child is picked by first
/// flipping a fair coin between the terminal and the function category and then choosing
/// uniformly inside the category, until the depth budget forces terminals.
#[derive(Debug, Clone, Copy)]
pub struct TreeGenerator {
    max_depth: usize,
}

impl TreeGenerator {
    /// # Panics
    /// When `max_depth < 2`, since a function root needs at least one level of children.
    pub fn new(max_depth: usize) -> Self {
        assert!(
            max_depth >= 2,
            "max_depth must be at least 2, got {}",
            max_depth
        );
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Generates a complete program whose depth never exceeds `max_depth`.
    pub fn generate_tree<R: Rng>(&self, rng: &mut R) -> Program {
        let command = random_function(rng);
        let children = (0..command.arity())
            .map(|_| self.grow(rng, self.max_depth - 1))
            .collect();
        Program::new(Node::new(command, children))
    }

    /// Generates a subtree spanning at most `levels` levels, used both for the children of a
    /// fresh root and by subtree mutation.
    pub fn grow<R: Rng>(&self, rng: &mut R, levels: usize) -> Node {
        if levels <= 1 || rng.random_bool(0.5) {
            return Node::leaf(random_terminal(rng));
        }
        let command = random_function(rng);
        let children = (0..command.arity())
            .map(|_| self.grow(rng, levels - 1))
            .collect();
        Node::new(command, children)
    }
}

pub fn random_terminal<R: Rng>(rng: &mut R) -> Command {
    Command::TERMINALS[rng.random_range(0..Command::TERMINALS.len())]
}

pub fn random_function<R: Rng>(rng: &mut R) -> Command {
    Command::FUNCTIONS[rng.random_range(0..Command::FUNCTIONS.len())]
}

/// A different command with the same arity as `command`, or `None` when the arity class has
/// a single member (PROGN3).
pub fn same_arity_alternative<R: Rng>(rng: &mut R, command: Command) -> Option<Command> {
    let candidates: Vec<Command> = Command::FUNCTIONS
        .iter()
        .chain(Command::TERMINALS.iter())
        .copied()
        .filter(|c| *c != command && c.arity() == command.arity())
        .collect();
    candidates.choose(rng).copied()
}
