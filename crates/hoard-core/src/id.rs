use slotmap::new_key_type;

new_key_type! {
    /// Identifies a resource pool owned by an economy.
    pub struct PoolId;

    /// Identifies a producer owned by an economy.
    pub struct ProducerId;

    /// Identifies a consumer owned by an economy.
    pub struct ConsumerId;

    /// Identifies a market owned by an economy.
    pub struct MarketId;
}
