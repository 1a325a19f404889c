use chrono::Utc;
use std::collections::HashSet;
use tracing::info;

use shared::{
    Category, CategoryListQuery, CategoryTreeNode, CategoryType, CreateCategoryRequest,
    UpdateCategoryRequest,
};

use super::models::account::NAME_MAX_LEN;
use super::{DomainError, DomainResult};
use crate::storage::CategoryRepository;

#[derive(Clone)]
pub struct CategoryService {
    categories: CategoryRepository,
}

impl CategoryService {
    pub fn new(categories: CategoryRepository) -> Self {
        Self { categories }
    }

    pub async fn create_category(&self, request: CreateCategoryRequest) -> DomainResult<Category> {
        info!("Creating category: {}", request.nome);

        let nome = validate_name(&request.nome)?;
        if let Some(parent_id) = request.categoria_pai_id.as_deref() {
            self.check_parent(parent_id, request.tipo).await?;
        }

        let now = Utc::now();
        let category = Category {
            id: uuid::Uuid::new_v4().to_string(),
            usuario_id: request.usuario_id,
            nome: nome.to_string(),
            tipo: request.tipo.into(),
            categoria_pai_id: request.categoria_pai_id,
            cor: request.cor,
            icone: request.icone,
            descricao: request.descricao,
            ativo: request.ativo,
            dados_demo: request.dados_demo,
            criado_em: now,
            atualizado_em: now,
        };
        self.categories.store_category(&category).await?;

        info!("Created category {}", category.id);
        Ok(category)
    }

    pub async fn get_category(&self, category_id: &str) -> DomainResult<Category> {
        self.categories
            .get_category(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", category_id))
    }

    pub async fn list_categories(&self, query: CategoryListQuery) -> DomainResult<Vec<Category>> {
        Ok(self
            .categories
            .list_categories(query.usuario_id.as_deref(), query.tipo)
            .await?)
    }

    /// Partial update. A new parent must share the category's type and must
    /// not sit below the category itself.
    pub async fn update_category(
        &self,
        category_id: &str,
        request: UpdateCategoryRequest,
    ) -> DomainResult<Category> {
        info!("Updating category {}", category_id);

        let mut category = self.get_category(category_id).await?;

        if let Some(nome) = request.nome.as_deref() {
            category.nome = validate_name(nome)?.to_string();
        }
        if let Some(parent_id) = request.categoria_pai_id {
            let Some(tipo) = category.tipo.known() else {
                return Err(DomainError::validation(format!(
                    "Category type '{}' is not recognized; it cannot be moved under a parent",
                    category.tipo.as_str()
                )));
            };
            self.check_parent(&parent_id, tipo).await?;
            self.check_not_descendant(category_id, &parent_id).await?;
            category.categoria_pai_id = Some(parent_id);
        }
        if request.cor.is_some() {
            category.cor = request.cor;
        }
        if request.icone.is_some() {
            category.icone = request.icone;
        }
        if request.descricao.is_some() {
            category.descricao = request.descricao;
        }
        if let Some(ativo) = request.ativo {
            category.ativo = ativo;
        }
        category.atualizado_em = Utc::now();

        self.categories.update_category(&category).await?;
        Ok(category)
    }

    pub async fn list_subcategories(&self, category_id: &str) -> DomainResult<Vec<Category>> {
        self.get_category(category_id).await?;
        Ok(self.categories.list_children(category_id).await?)
    }

    /// Active categories of one type, nested under their parents
    pub async fn category_tree(&self, query: CategoryListQuery) -> DomainResult<Vec<CategoryTreeNode>> {
        let tipo = query
            .tipo
            .ok_or_else(|| DomainError::validation("Category type is required"))?;
        let categories: Vec<Category> = self
            .categories
            .list_categories(query.usuario_id.as_deref(), Some(tipo))
            .await?
            .into_iter()
            .filter(|category| category.ativo)
            .collect();
        Ok(build_tree(&categories, None))
    }

    /// Categories still used by subcategories, transactions, budgets or
    /// recurring rules cannot be deleted
    pub async fn delete_category(&self, category_id: &str) -> DomainResult<()> {
        info!("Deleting category {}", category_id);

        self.get_category(category_id).await?;
        let references = self.categories.referenced_by(category_id).await?;
        if !references.is_empty() {
            return Err(DomainError::validation(format!(
                "Category is used by {} and cannot be deleted",
                references.join(" and ")
            )));
        }
        self.categories.delete_category(category_id).await?;
        Ok(())
    }

    /// Subcategories inherit their parent's direction
    async fn check_parent(&self, parent_id: &str, tipo: CategoryType) -> DomainResult<()> {
        let parent = self
            .categories
            .get_category(parent_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Parent category", parent_id))?;
        if !parent.tipo.is(tipo) {
            return Err(DomainError::validation(format!(
                "Subcategory type '{}' must match parent type '{}'",
                tipo,
                parent.tipo.as_str()
            )));
        }
        Ok(())
    }

    async fn check_not_descendant(&self, category_id: &str, parent_id: &str) -> DomainResult<()> {
        let mut visited = HashSet::new();
        let mut current = Some(parent_id.to_string());
        while let Some(id) = current {
            if id == category_id {
                return Err(DomainError::validation(
                    "A category cannot be moved under itself or its subcategories",
                ));
            }
            if !visited.insert(id.clone()) {
                break;
            }
            current = self
                .categories
                .get_category(&id)
                .await?
                .and_then(|category| category.categoria_pai_id);
        }
        Ok(())
    }
}

fn validate_name(nome: &str) -> DomainResult<&str> {
    let nome = nome.trim();
    if nome.is_empty() {
        return Err(DomainError::validation("Category name cannot be empty"));
    }
    if nome.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation(
            "Category name cannot exceed 100 characters",
        ));
    }
    Ok(nome)
}

fn build_tree(categories: &[Category], parent_id: Option<&str>) -> Vec<CategoryTreeNode> {
    categories
        .iter()
        .filter(|category| category.categoria_pai_id.as_deref() == parent_id)
        .map(|category| CategoryTreeNode {
            id: category.id.clone(),
            nome: category.nome.clone(),
            cor: category.cor.clone(),
            icone: category.icone.clone(),
            descricao: category.descricao.clone(),
            subcategorias: build_tree(categories, Some(category.id.as_str())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{sample_account, sample_transaction, setup_test};
    use crate::storage::{AccountRepository, TransactionRepository};
    use chrono::NaiveDate;
    use shared::{AccountType, TransactionType};

    async fn create_test_service() -> CategoryService {
        let (db, normalizer) = setup_test().await;
        CategoryService::new(CategoryRepository::new(db, normalizer))
    }

    fn request(nome: &str, tipo: CategoryType, parent: Option<&str>) -> CreateCategoryRequest {
        CreateCategoryRequest {
            usuario_id: "u-1".to_string(),
            nome: nome.to_string(),
            tipo,
            categoria_pai_id: parent.map(str::to_string),
            cor: None,
            icone: None,
            descricao: None,
            ativo: true,
            dados_demo: false,
        }
    }

    #[tokio::test]
    async fn test_subcategory_must_share_parent_type() {
        let service = create_test_service().await;
        let parent = service
            .create_category(request("Moradia", CategoryType::Despesa, None))
            .await
            .unwrap();

        let child = service
            .create_category(request("Aluguel", CategoryType::Despesa, Some(&parent.id)))
            .await
            .expect("Matching type should be accepted");
        assert_eq!(child.categoria_pai_id.as_deref(), Some(parent.id.as_str()));

        let mismatch = service
            .create_category(request("Bônus", CategoryType::Receita, Some(&parent.id)))
            .await;
        assert!(matches!(mismatch, Err(DomainError::Validation(_))));

        let missing = service
            .create_category(request("Solta", CategoryType::Despesa, Some("nope")))
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_children() {
        let service = create_test_service().await;
        let parent = service
            .create_category(request("Transporte", CategoryType::Despesa, None))
            .await
            .unwrap();
        let child = service
            .create_category(request("Combustível", CategoryType::Despesa, Some(&parent.id)))
            .await
            .unwrap();

        assert!(service.delete_category(&parent.id).await.is_err());
        service.delete_category(&child.id).await.unwrap();
        service.delete_category(&parent.id).await.unwrap();

        let remaining = service.list_categories(CategoryListQuery::default()).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_transactions() {
        let (db, normalizer) = setup_test().await;
        let service = CategoryService::new(CategoryRepository::new(db.clone(), normalizer.clone()));
        let category = service
            .create_category(request("Mercado", CategoryType::Despesa, None))
            .await
            .unwrap();

        AccountRepository::new(db.clone(), normalizer.clone())
            .store_account(&sample_account("acc-1", "u-1", AccountType::ContaCorrente))
            .await
            .unwrap();
        let transactions = TransactionRepository::new(db, normalizer);
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut expense = sample_transaction("t-1", "acc-1", TransactionType::Despesa, 80.0, day);
        expense.categoria_id = Some(category.id.clone());
        transactions.store_transaction(&expense).await.unwrap();

        match service.delete_category(&category.id).await {
            Err(DomainError::Validation(message)) => assert!(message.contains("transactions")),
            other => panic!("Expected a validation error, got {:?}", other),
        }

        transactions.delete_transaction("t-1").await.unwrap();
        service.delete_category(&category.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_category() {
        let service = create_test_service().await;
        let food = service
            .create_category(request("Alimentação", CategoryType::Despesa, None))
            .await
            .unwrap();
        let restaurants = service
            .create_category(request("Restaurantes", CategoryType::Despesa, None))
            .await
            .unwrap();
        let salary = service
            .create_category(request("Salário", CategoryType::Receita, None))
            .await
            .unwrap();

        let moved = service
            .update_category(
                &restaurants.id,
                UpdateCategoryRequest {
                    nome: Some(" Restaurantes e bares ".to_string()),
                    categoria_pai_id: Some(food.id.clone()),
                    ativo: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.nome, "Restaurantes e bares");
        assert_eq!(moved.categoria_pai_id.as_deref(), Some(food.id.as_str()));
        assert!(!moved.ativo);
        assert_eq!(service.get_category(&restaurants.id).await.unwrap(), moved);

        let wrong_type = service
            .update_category(
                &salary.id,
                UpdateCategoryRequest {
                    categoria_pai_id: Some(food.id.clone()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(wrong_type, Err(DomainError::Validation(_))));

        let cycle = service
            .update_category(
                &food.id,
                UpdateCategoryRequest {
                    categoria_pai_id: Some(restaurants.id.clone()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(cycle, Err(DomainError::Validation(_))));

        let blank = service
            .update_category(
                &food.id,
                UpdateCategoryRequest {
                    nome: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(blank, Err(DomainError::Validation(_))));

        let missing = service
            .update_category("ghost", UpdateCategoryRequest::default())
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_subcategories_and_tree() {
        let service = create_test_service().await;
        let housing = service
            .create_category(request("Moradia", CategoryType::Despesa, None))
            .await
            .unwrap();
        service
            .create_category(request("Aluguel", CategoryType::Despesa, Some(&housing.id)))
            .await
            .unwrap();
        let mut inactive = request("Condomínio", CategoryType::Despesa, Some(&housing.id));
        inactive.ativo = false;
        service.create_category(inactive).await.unwrap();
        service
            .create_category(request("Lazer", CategoryType::Despesa, None))
            .await
            .unwrap();
        service
            .create_category(request("Salário", CategoryType::Receita, None))
            .await
            .unwrap();

        let children = service.list_subcategories(&housing.id).await.unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.nome.as_str()).collect();
        assert_eq!(names, vec!["Aluguel", "Condomínio"]);
        assert!(matches!(
            service.list_subcategories("ghost").await,
            Err(DomainError::NotFound { .. })
        ));

        let tree = service
            .category_tree(CategoryListQuery {
                usuario_id: Some("u-1".to_string()),
                tipo: Some(CategoryType::Despesa),
            })
            .await
            .unwrap();
        let roots: Vec<&str> = tree.iter().map(|node| node.nome.as_str()).collect();
        assert_eq!(roots, vec!["Lazer", "Moradia"]);
        assert_eq!(tree[1].subcategorias.len(), 1);
        assert_eq!(tree[1].subcategorias[0].nome, "Aluguel");
        assert!(tree[0].subcategorias.is_empty());

        assert!(matches!(
            service.category_tree(CategoryListQuery::default()).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let service = create_test_service().await;
        let result = service
            .create_category(request("  ", CategoryType::Receita, None))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
