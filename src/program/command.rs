use std::fmt;

/// The instruction set of a robot program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // --- Functions ---
    /// Run three children in order
    Progn3,
    /// Run two children in order
    Progn2,
    /// First child when a wall is two steps ahead, second child otherwise
    IfWall,
    /// First child when the ball is visible, second child otherwise
    IfBall,

    // --- Terminals ---
    WalkFront,
    WalkBack,
    Left,
    Right,
    Align,
}

impl Command {
    pub const FUNCTIONS: [Command; 4] = [
        Command::Progn3,
        Command::Progn2,
        Command::IfWall,
        Command::IfBall,
    ];

    pub const TERMINALS: [Command; 5] = [
        Command::WalkFront,
        Command::WalkBack,
        Command::Left,
        Command::Right,
        Command::Align,
    ];

    /// Number of children a node carrying this command must have.
    pub fn arity(self) -> usize {
        match self {
            Command::Progn3 => 3,
            Command::Progn2 | Command::IfWall | Command::IfBall => 2,
            Command::WalkFront
            | Command::WalkBack
            | Command::Left
            | Command::Right
            | Command::Align => 0,
        }
    }

    pub fn is_function(self) -> bool {
        self.arity() > 0
    }

    /// Character used by the persisted program format.
    pub fn to_char(self) -> char {
        match self {
            Command::Progn3 => '3',
            Command::Progn2 => '2',
            Command::IfWall => 'I',
            Command::IfBall => 'C',
            Command::WalkFront => 'F',
            Command::WalkBack => 'B',
            Command::Left => 'L',
            Command::Right => 'R',
            Command::Align => 'A',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        let command = match c {
            '3' => Command::Progn3,
            '2' => Command::Progn2,
            'I' => Command::IfWall,
            'C' => Command::IfBall,
            'F' => Command::WalkFront,
            'B' => Command::WalkBack,
            'L' => Command::Left,
            'R' => Command::Right,
            'A' => Command::Align,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Progn3 => "PROGN3",
            Command::Progn2 => "PROGN2",
            Command::IfWall => "IFWALL",
            Command::IfBall => "IFBALL",
            Command::WalkFront => "WALKFRONT",
            Command::WalkBack => "WALKBACK",
            Command::Left => "LEFT",
            Command::Right => "RIGHT",
            Command::Align => "ALIGN",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
