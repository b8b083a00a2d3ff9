/// One reachable Node instance for a given route or event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub instance_id: String,
    pub address: String,
    pub weight: u32,
}

impl Endpoint {
    pub fn new(instance_id: impl Into<String>, address: impl Into<String>, weight: u32) -> Self {
        Self {
            instance_id: instance_id.into(),
            address: address.into(),
            weight: weight.max(1),
        }
    }
}
