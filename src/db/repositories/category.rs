use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::collections::{HashMap, HashSet};

use crate::entities::{categories, category_images, prelude::*};

/// Index from category id to the ids of its direct children, in id order.
pub type ChildIndex = HashMap<i32, Vec<i32>>;

/// Build the parent -> children index for a set of categories.
#[must_use]
pub fn child_index(categories: &[categories::Model]) -> ChildIndex {
    let mut index: ChildIndex = HashMap::new();
    for category in categories {
        if let Some(parent_id) = category.parent_id {
            index.entry(parent_id).or_default().push(category.id);
        }
    }
    index
}

/// Collect every id reachable from `root` through the child index, in
/// depth-first preorder, excluding `root` itself. The visited set makes the
/// walk terminate even on a corrupted parent chain.
#[must_use]
pub fn descendant_ids(root: i32, index: &ChildIndex) -> Vec<i32> {
    let mut result = Vec::new();
    let mut visited = HashSet::from([root]);
    let mut stack: Vec<i32> = index
        .get(&root)
        .map(|children| children.iter().rev().copied().collect())
        .unwrap_or_default();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        result.push(id);
        if let Some(children) = index.get(&id) {
            stack.extend(children.iter().rev());
        }
    }

    result
}

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_all(&self) -> Result<Vec<categories::Model>> {
        Categories::find()
            .all(&self.conn)
            .await
            .context("Failed to list categories")
    }

    pub async fn list_roots(&self) -> Result<Vec<categories::Model>> {
        Categories::find()
            .filter(categories::Column::ParentId.is_null())
            .all(&self.conn)
            .await
            .context("Failed to list root categories")
    }

    pub async fn get(&self, id: i32) -> Result<Option<categories::Model>> {
        Categories::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query category")
    }

    /// The queried category's subtree ids: the category itself followed by
    /// all of its transitive descendants. `None` when the id is unknown.
    pub async fn subtree_ids(&self, root: i32) -> Result<Option<Vec<i32>>> {
        let all = self.list_all().await?;
        if !all.iter().any(|c| c.id == root) {
            return Ok(None);
        }

        let index = child_index(&all);
        let mut ids = vec![root];
        ids.extend(descendant_ids(root, &index));
        Ok(Some(ids))
    }

    pub async fn create(
        &self,
        name: &str,
        parent_id: Option<i32>,
        image: &str,
    ) -> Result<categories::Model> {
        if let Some(parent_id) = parent_id {
            self.get(parent_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Parent category {parent_id} does not exist"))?;
        }

        let active = categories::ActiveModel {
            name: Set(name.to_string()),
            parent_id: Set(parent_id),
            image: Set(image.to_string()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert category")
    }

    /// Re-parent a category. Rejects moves that would make the category its
    /// own ancestor, which would corrupt the tree.
    pub async fn set_parent(&self, id: i32, parent_id: Option<i32>) -> Result<()> {
        let category = self
            .get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category {id} does not exist"))?;

        if let Some(parent_id) = parent_id {
            let all = self.list_all().await?;
            let parents: HashMap<i32, Option<i32>> =
                all.iter().map(|c| (c.id, c.parent_id)).collect();

            if !parents.contains_key(&parent_id) {
                anyhow::bail!("Parent category {parent_id} does not exist");
            }

            let mut ancestor = Some(parent_id);
            let mut seen = HashSet::new();
            while let Some(current) = ancestor {
                if current == id {
                    anyhow::bail!("Moving category {id} under {parent_id} would create a cycle");
                }
                if !seen.insert(current) {
                    break;
                }
                ancestor = parents.get(&current).copied().flatten();
            }
        }

        let mut active: categories::ActiveModel = category.into();
        active.parent_id = Set(parent_id);
        active
            .update(&self.conn)
            .await
            .context("Failed to update category parent")?;

        Ok(())
    }

    pub async fn images_for(
        &self,
        category_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<category_images::Model>>> {
        if category_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = CategoryImages::find()
            .filter(category_images::Column::CategoryId.is_in(category_ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query category images")?;

        let mut grouped: HashMap<i32, Vec<category_images::Model>> = HashMap::new();
        for row in rows {
            grouped.entry(row.category_id).or_default().push(row);
        }
        Ok(grouped)
    }

    pub async fn add_image(
        &self,
        category_id: i32,
        image: &str,
        description: &str,
    ) -> Result<category_images::Model> {
        let active = category_images::ActiveModel {
            category_id: Set(category_id),
            image: Set(image.to_string()),
            description: Set(description.to_string()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert category image")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(edges: &[(i32, i32)]) -> ChildIndex {
        let mut index: ChildIndex = HashMap::new();
        for (parent, child) in edges {
            index.entry(*parent).or_default().push(*child);
        }
        index
    }

    #[test]
    fn test_descendants_preorder() {
        // 1 -> {2, 3}, 2 -> {4}
        let index = index(&[(1, 2), (1, 3), (2, 4)]);
        assert_eq!(descendant_ids(1, &index), vec![2, 4, 3]);
        assert_eq!(descendant_ids(2, &index), vec![4]);
        assert_eq!(descendant_ids(3, &index), Vec::<i32>::new());
    }

    #[test]
    fn test_descendants_of_unknown_root() {
        let index = index(&[(1, 2)]);
        assert_eq!(descendant_ids(99, &index), Vec::<i32>::new());
    }

    #[test]
    fn test_descendants_terminate_on_corrupted_index() {
        // 1 -> 2 -> 1, a cycle that must not loop forever
        let index = index(&[(1, 2), (2, 1)]);
        assert_eq!(descendant_ids(1, &index), vec![2]);
    }

    #[test]
    fn test_descendants_no_duplicates_on_diamond() {
        let index = index(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let ids = descendant_ids(1, &index);
        let unique: HashSet<i32> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
    }
}
