use std::fmt;
use std::str::FromStr;

/// Logical message stream; each flow has its own virtual host and bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    InPlay,
    PreMatch,
}

impl FlowKind {
    pub const ALL: [FlowKind; 2] = [FlowKind::InPlay, FlowKind::PreMatch];

    /// Broker virtual host serving this flow
    pub fn virtual_host(self) -> &'static str {
        match self {
            FlowKind::InPlay => "StmInPlay",
            FlowKind::PreMatch => "StmPreMatch",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::InPlay => "inplay",
            FlowKind::PreMatch => "prematch",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "inplay" => Ok(FlowKind::InPlay),
            "prematch" => Ok(FlowKind::PreMatch),
            _ => Err(format!("unknown flow '{}'", s)),
        }
    }
}
