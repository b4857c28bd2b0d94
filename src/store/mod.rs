use futures::stream::TryStreamExt;
use log::info;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson};
use mongodb::{Client, Collection, Database};

use crate::error::AppError;
use crate::models::{Character, User};

/// Explicitly constructed MongoDB handle, passed to request handlers instead
/// of living in process-wide state.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        info!("Connected to MongoDB database '{}'", database);
        Ok(Self { db })
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn characters(&self) -> Collection<Character> {
        self.db.collection("characters")
    }

    pub async fn count_users(&self) -> Result<u64, AppError> {
        Ok(self.users().count_documents(doc! {}).await?)
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()
            .find_one(doc! { "username": username })
            .await?)
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.users().insert_one(user).await?;
        Ok(())
    }

    /// Characters, most recently created first.
    pub async fn list_characters(&self) -> Result<Vec<Character>, AppError> {
        let cursor = self
            .characters()
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_character_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Character>, AppError> {
        Ok(self.characters().find_one(doc! { "name": name }).await?)
    }

    pub async fn find_character(&self, id: ObjectId) -> Result<Option<Character>, AppError> {
        Ok(self.characters().find_one(doc! { "_id": id }).await?)
    }

    pub async fn insert_character(&self, character: &Character) -> Result<ObjectId, AppError> {
        let result = self.characters().insert_one(character).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("insert did not return an ObjectId".into()))
    }

    pub async fn delete_character(&self, id: ObjectId) -> Result<bool, AppError> {
        let result = self.characters().delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    /// Total bytes of stored reference images across all characters. Drives
    /// the storage-quota check before a new upload is written.
    pub async fn total_image_bytes(&self) -> Result<i64, AppError> {
        let pipeline = vec![
            doc! { "$unwind": "$images" },
            doc! { "$group": { "_id": null, "total": { "$sum": "$images.size" } } },
        ];
        let mut cursor = self.characters().aggregate(pipeline).await?;
        if let Some(row) = cursor.try_next().await? {
            return Ok(match row.get("total") {
                Some(Bson::Int64(n)) => *n,
                Some(Bson::Int32(n)) => i64::from(*n),
                Some(Bson::Double(n)) => *n as i64,
                _ => 0,
            });
        }
        Ok(0)
    }
}
