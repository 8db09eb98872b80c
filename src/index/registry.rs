//! Process-wide catalog of named single-column and composite B-tree
//! indexes, keyed by (table, columns).

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{Result, StorageError};
use crate::index::btree::BTree;
use crate::key::CompositeKey;
use crate::types::{RowId, RowValues, Schema};

/// Metadata about one registered index, alongside the tree itself.
pub struct SingleIndexDescriptor {
    pub index_name: String,
    pub table: String,
    pub column: String,
    pub row_count: usize,
    tree: BTree<String>,
}

/// Metadata about one registered composite index, alongside its tree.
pub struct CompositeIndexDescriptor {
    pub index_name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    tree: BTree<CompositeKey>,
}

#[derive(Default)]
struct Maps {
    single: HashMap<String, SingleIndexDescriptor>,
    composite: HashMap<String, CompositeIndexDescriptor>,
}

/// Process-wide index catalog. Holds two disjoint maps (single-column and
/// composite) from index name to descriptor, guarded by one reader/writer
/// lock: concurrent readers may plan and execute leaf lookups in
/// parallel; index build, row propagation, and clearing take the
/// exclusive path. No two indexes, single or composite, may share a
/// name.
#[derive(Default)]
pub struct IndexRegistry {
    maps: RwLock<Maps>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name_available(maps: &Maps, index_name: &str) -> Result<()> {
        if maps.single.contains_key(index_name) || maps.composite.contains_key(index_name) {
            return Err(StorageError::InvalidArgument(format!(
                "index name already registered: {index_name}"
            )));
        }
        Ok(())
    }

    /// Builds a single-column index over `rows`, each row given as its
    /// full projected value vector in schema order. Fails with
    /// `SchemaError` if `column` is not in `schema`; the partial tree is
    /// discarded before returning.
    pub fn build_single(
        &self,
        index_name: &str,
        table: &str,
        column: &str,
        rows: &[(RowId, RowValues)],
        schema: &Schema,
    ) -> Result<()> {
        let pos = schema
            .position(column)
            .ok_or_else(|| StorageError::SchemaError(format!("column not found: {column}")))?;

        let mut maps = self.maps.write();
        Self::check_name_available(&maps, index_name)?;

        let mut tree = BTree::new();
        for (row_id, values) in rows {
            let value = values.get(pos).cloned().unwrap_or_default();
            tree.insert(value, *row_id);
        }
        let row_count = rows.len();
        maps.single.insert(
            index_name.to_string(),
            SingleIndexDescriptor {
                index_name: index_name.to_string(),
                table: table.to_string(),
                column: column.to_string(),
                row_count,
                tree,
            },
        );
        Ok(())
    }

    /// Builds a composite index over `columns` (≥2 column names). A row
    /// missing one of the fields contributes an empty string for that
    /// position.
    pub fn build_composite(
        &self,
        index_name: &str,
        table: &str,
        columns: &[String],
        rows: &[(RowId, RowValues)],
        schema: &Schema,
    ) -> Result<()> {
        let positions: Vec<Option<usize>> = columns.iter().map(|c| schema.position(c)).collect();
        if let Some((col, _)) = columns.iter().zip(&positions).find(|(_, p)| p.is_none()) {
            return Err(StorageError::SchemaError(format!("column not found: {col}")));
        }

        let mut maps = self.maps.write();
        Self::check_name_available(&maps, index_name)?;

        let mut tree = BTree::new();
        for (row_id, values) in rows {
            let key_values: Vec<String> = positions
                .iter()
                .map(|p| p.and_then(|i| values.get(i)).cloned().unwrap_or_default())
                .collect();
            tree.insert(CompositeKey::new(key_values), *row_id);
        }
        let row_count = rows.len();
        maps.composite.insert(
            index_name.to_string(),
            CompositeIndexDescriptor {
                index_name: index_name.to_string(),
                table: table.to_string(),
                columns: columns.to_vec(),
                row_count,
                tree,
            },
        );
        Ok(())
    }

    /// Exact-match lookup against a single-column index. Tolerant:
    /// returns an empty result for an unknown index rather than erroring.
    pub fn lookup_single(&self, index_name: &str, value: &str) -> Vec<RowId> {
        let maps = self.maps.read();
        maps.single.get(index_name).map(|d| d.tree.search(&value.to_string())).unwrap_or_default()
    }

    /// Inclusive range lookup against a single-column index.
    pub fn range_search_single(&self, index_name: &str, min: &str, max: &str) -> Vec<RowId> {
        let maps = self.maps.read();
        maps.single
            .get(index_name)
            .map(|d| d.tree.range_search(&min.to_string(), &max.to_string()))
            .unwrap_or_default()
    }

    /// Exact-match lookup against a composite index.
    pub fn lookup_composite(&self, index_name: &str, values: &[String]) -> Vec<RowId> {
        let maps = self.maps.read();
        let Some(d) = maps.composite.get(index_name) else { return Vec::new() };
        let key = CompositeKey::new(values.to_vec());
        d.tree.search(&key)
    }

    /// Inclusive range lookup against a composite index.
    pub fn range_search_composite(&self, index_name: &str, min: &CompositeKey, max: &CompositeKey) -> Vec<RowId> {
        let maps = self.maps.read();
        maps.composite.get(index_name).map(|d| d.tree.range_search(min, max)).unwrap_or_default()
    }

    /// Inserts `row` into every descriptor registered for `table`. Must
    /// be invoked on every row insert to keep indexes coherent; updates
    /// become visible to the next query immediately (single write lock
    /// acquisition covers all affected descriptors).
    pub fn update_indexes(&self, table: &str, row_id: RowId, row: &RowValues, schema: &Schema) {
        let mut maps = self.maps.write();
        for d in maps.single.values_mut().filter(|d| d.table == table) {
            let pos = schema.position(&d.column);
            let value = pos.and_then(|i| row.get(i)).cloned().unwrap_or_default();
            d.tree.insert(value, row_id);
            d.row_count += 1;
        }
        for d in maps.composite.values_mut().filter(|d| d.table == table) {
            let key_values: Vec<String> = d
                .columns
                .iter()
                .map(|c| schema.position(c).and_then(|i| row.get(i)).cloned().unwrap_or_default())
                .collect();
            d.tree.insert(CompositeKey::new(key_values), row_id);
            d.row_count += 1;
        }
    }

    /// Removes every descriptor (single and composite) registered for
    /// `table`.
    pub fn clear(&self, table: &str) {
        let mut maps = self.maps.write();
        maps.single.retain(|_, d| d.table != table);
        maps.composite.retain(|_, d| d.table != table);
    }

    /// True if a single-column index exists covering `column` on `table`.
    pub fn find_single(&self, table: &str, column: &str) -> Option<String> {
        let maps = self.maps.read();
        maps.single
            .values()
            .find(|d| d.table == table && d.column == column)
            .map(|d| d.index_name.clone())
    }

    /// True if a composite index exists whose leading columns match, in
    /// order, `columns` (or a prefix of it).
    pub fn find_composite_prefix(&self, table: &str, columns: &[String]) -> Option<(String, usize)> {
        let maps = self.maps.read();
        maps.composite
            .values()
            .filter(|d| d.table == table)
            .filter_map(|d| {
                let matched = d.columns.iter().zip(columns).take_while(|(a, b)| a == b).count();
                (matched > 0).then_some((d.index_name.clone(), matched))
            })
            .max_by_key(|(_, matched)| *matched)
    }

    pub fn composite_columns(&self, index_name: &str) -> Option<Vec<String>> {
        self.maps.read().composite.get(index_name).map(|d| d.columns.clone())
    }

    /// All `(value, row_id)` pairs stored in a single-column index, in
    /// ascending key order. Used by the range-scan executor, which
    /// applies its own comparison rather than trusting the tree's
    /// lexicographic key order for numeric-looking values.
    pub fn all_single_entries(&self, index_name: &str) -> Vec<(String, RowId)> {
        let maps = self.maps.read();
        maps.single
            .get(index_name)
            .map(|d| d.tree.iter_entries().into_iter().map(|(k, r)| (k.clone(), r)).collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, index_name: &str) -> Option<usize> {
        let maps = self.maps.read();
        maps.single
            .get(index_name)
            .map(|d| d.row_count)
            .or_else(|| maps.composite.get(index_name).map(|d| d.row_count))
    }
}
