/// One of the four stem categories a mashup is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    Vocals,
    Other,
    Bass,
    Drums,
}

impl Lane {
    pub const ALL: [Lane; 4] = [Lane::Vocals, Lane::Other, Lane::Bass, Lane::Drums];

    pub fn name(&self) -> &'static str {
        match self {
            Lane::Vocals => "vocals",
            Lane::Other => "other",
            Lane::Bass => "bass",
            Lane::Drums => "drums",
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Lane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lane::ALL
            .into_iter()
            .find(|lane| lane.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown lane '{s}'"))
    }
}
