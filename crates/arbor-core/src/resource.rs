use bytes::Bytes;

/// Named opaque payload synthesized by a transformer, accumulated
/// append-only over one pipeline run.
#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
    pub data: Bytes,
    /// Also embed this resource into the reference output.
    pub reference_output: bool,
}

impl Resource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Resource {
        Resource {
            name: name.into(),
            data: data.into(),
            reference_output: false,
        }
    }

    pub fn for_reference_output(mut self) -> Resource {
        self.reference_output = true;
        self
    }
}
