use std::fmt;

/// Location of a node inside a value tree, rendered as `ROOT.items.<2>.count`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuePath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

impl ValuePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn field(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Field(name.to_string()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(index));
        next
    }

    /// Tuple members without a declared name are addressed by position.
    pub fn member(&self, name: &str, index: usize) -> Self {
        if name.is_empty() {
            self.index(index)
        } else {
            self.field(name)
        }
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ROOT")?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(i) => write!(f, ".<{}>", i)?,
            }
        }
        Ok(())
    }
}
