pub trait StorageIterator {
    type Item;
    type Error;

    /// Get the current value, `None` once the iterator is exhausted.
    fn value(&self) -> Option<Self::Item>;

    /// Check if the current iterator is valid.
    fn is_valid(&self) -> bool;

    /// Move to the next position
    fn advance(&mut self) -> Result<(), Self::Error>;
}
