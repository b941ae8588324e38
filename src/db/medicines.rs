use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use tracing::{error, info};

use super::DbClient;
use crate::db::models::{
    Category, Medicine, MedicineChanges, MedicineParams, MedicinePatch, MedicineWithCategory,
    NewMedicine,
};
use crate::errors::ApiError;
use crate::Result;

/// DbClient helper functions for the medicine catalog
impl DbClient {
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        use crate::schema::categories::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        categories
            .order_by(id)
            .load::<Category>(conn)
            .await
            .map_err(Into::into)
    }

    /// Catalog listing with each medicine's category
    pub async fn list_medicines(&self) -> Result<Vec<MedicineWithCategory>> {
        use crate::schema::{categories, medicines};

        let conn = &mut self.get_db_conn().await?;
        let rows = medicines::table
            .inner_join(categories::table)
            .order_by(medicines::name)
            .select((Medicine::as_select(), Category::as_select()))
            .load::<(Medicine, Category)>(conn)
            .await
            .map_err(|e| {
                error!("Failed to fetch medicines: {}", e);
                ApiError::from(e)
            })?;

        Ok(rows
            .into_iter()
            .map(|(medicine, category)| MedicineWithCategory {
                medicine,
                category_name: category.name,
                requires_prescription: category.requires_prescription,
            })
            .collect())
    }

    pub async fn get_medicine(&self, medicine_id: i32) -> Result<Medicine> {
        use crate::schema::medicines::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        medicines
            .find(medicine_id)
            .first::<Medicine>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Medicine".to_string()))
    }

    async fn ensure_category(&self, category: i32) -> Result<()> {
        use crate::schema::categories::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let found = categories
            .find(category)
            .select(id)
            .first::<i32>(conn)
            .await
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(ApiError::Validation(format!("Unknown category {category}"))),
        }
    }

    pub async fn create_medicine(&self, params: MedicineParams) -> Result<Medicine> {
        use crate::schema::medicines::dsl::*;

        self.ensure_category(params.category_id).await?;
        let conn = &mut self.get_db_conn().await?;

        let new_medicine = NewMedicine {
            name: params.name.trim().to_string(),
            description: params.description,
            price: params.price,
            stock: params.stock,
            category_id: params.category_id,
        };
        let medicine = diesel::insert_into(medicines)
            .values(&new_medicine)
            .get_result::<Medicine>(conn)
            .await?;
        info!("Created medicine {} ({})", medicine.id, medicine.name);
        Ok(medicine)
    }

    pub async fn update_medicine(&self, medicine_id: i32, patch: MedicinePatch) -> Result<Medicine> {
        use crate::schema::medicines::dsl::*;

        if let Some(category) = patch.category_id {
            self.ensure_category(category).await?;
        }

        let changes = MedicineChanges {
            name: patch.name.map(|n| n.trim().to_string()),
            description: patch.description,
            price: patch.price,
            stock: patch.stock,
            category_id: patch.category_id,
        };
        if changes.name.is_none()
            && changes.description.is_none()
            && changes.price.is_none()
            && changes.stock.is_none()
            && changes.category_id.is_none()
        {
            return self.get_medicine(medicine_id).await;
        }

        let conn = &mut self.get_db_conn().await?;
        diesel::update(medicines.find(medicine_id))
            .set(&changes)
            .get_result::<Medicine>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Medicine".to_string()))
    }

    /// Medicines that appear on orders are kept for the order history
    pub async fn delete_medicine(&self, medicine_id: i32) -> Result<()> {
        use crate::schema::{medicines, orders};

        let conn = &mut self.get_db_conn().await?;
        let referenced = orders::table
            .filter(orders::medicine_id.eq(medicine_id))
            .count()
            .get_result::<i64>(conn)
            .await?;
        if referenced > 0 {
            return Err(ApiError::Conflict(format!(
                "Medicine {medicine_id} appears on {referenced} order(s) and cannot be deleted"
            )));
        }

        let deleted = diesel::delete(medicines::table.find(medicine_id))
            .execute(conn)
            .await?;
        if deleted == 0 {
            return Err(ApiError::NotFound("Medicine".to_string()));
        }
        info!("Deleted medicine {}", medicine_id);
        Ok(())
    }
}
