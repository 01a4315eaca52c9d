use tokio::sync::{mpsc, watch};

use crate::application::product::synchronizer::ProductList;
use crate::domain::product::filter::ProductFilter;
use crate::domain::product::model::Product;

/// The product grid as a consumer sees it: the synchronized list projected
/// through the latest debounced query.
pub struct CatalogView {
    products: watch::Receiver<ProductList>,
    queries: mpsc::UnboundedReceiver<String>,
    filter: ProductFilter,
    query: String,
    products_closed: bool,
    queries_closed: bool,
}

impl CatalogView {
    pub fn new(
        products: watch::Receiver<ProductList>,
        queries: mpsc::UnboundedReceiver<String>,
        filter: ProductFilter,
    ) -> Self {
        Self {
            products,
            queries,
            filter,
            query: String::new(),
            products_closed: false,
            queries_closed: false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn visible(&mut self) -> Vec<Product> {
        let products = self.products.borrow_and_update().clone();
        self.filter.project(&products, &self.query)
    }

    /// Waits for a new snapshot or a new query. Returns false once both
    /// sources are gone and the view can no longer change.
    pub async fn changed(&mut self) -> bool {
        loop {
            if self.products_closed && self.queries_closed {
                return false;
            }
            tokio::select! {
                result = self.products.changed(), if !self.products_closed => match result {
                    Ok(()) => return true,
                    Err(_) => self.products_closed = true,
                },
                query = self.queries.recv(), if !self.queries_closed => match query {
                    Some(query) => {
                        self.query = query;
                        return true;
                    }
                    None => self.queries_closed = true,
                },
            }
        }
    }
}
