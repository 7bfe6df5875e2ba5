//! In-memory cart aggregation rules.
//!
//! A [`Cart`] is loaded from the store, mutated here and written back as a
//! whole. Lines merge on `(product, option, note)`; every mutation checks the
//! quantity of *all* lines of a product against that product's stock.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Attachment, CartItem, Product},
};

#[derive(Debug, Clone)]
pub struct Cart {
    user_id: Uuid,
    lines: Vec<CartItem>,
}

/// Blank strings carry no meaning for line identity.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The product's lines may hold at most `stock` units in total.
fn within_stock(product: &Product, held: i32, quantity: i32) -> AppResult<()> {
    match held.checked_add(quantity) {
        Some(total) if total <= product.stock => Ok(()),
        _ => Err(AppError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: held.saturating_add(quantity),
        }),
    }
}

impl Cart {
    pub fn new(user_id: Uuid, lines: Vec<CartItem>) -> Self {
        Self { user_id, lines }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn lines(&self) -> &[CartItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, line_id: Uuid) -> Option<&CartItem> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Units of `product_id` across every line, whatever option or note.
    pub fn quantity_for(&self, product_id: Uuid) -> i32 {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    pub fn add(
        &mut self,
        product: &Product,
        quantity: i32,
        option: Option<String>,
        note: Option<String>,
    ) -> AppResult<CartItem> {
        if quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".to_string(),
            ));
        }
        let option = normalize(option);
        let note = normalize(note);
        if let Some(opt) = option.as_deref() {
            if !product.has_option(opt) {
                return Err(AppError::BadRequest(format!(
                    "option {opt} is not available for {}",
                    product.name
                )));
            }
        }

        let existing = self.quantity_for(product.id);
        within_stock(product, existing, quantity)?;

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.same_line(product.id, option.as_deref(), note.as_deref()))
        {
            line.quantity += quantity;
            return Ok(line.clone());
        }

        let line = CartItem {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            product_id: product.id,
            quantity,
            selected_option: option,
            note,
            attachments: Vec::new(),
            created_at: Utc::now(),
        };
        self.lines.push(line.clone());
        Ok(line)
    }

    /// Sets the quantity (and optionally the note) of one line.
    ///
    /// A quantity of zero or less removes the line and returns `None`. When a
    /// note change makes the line identical to another one, the two merge.
    /// `product` may be absent only when the line is being removed.
    pub fn update_line(
        &mut self,
        line_id: Uuid,
        quantity: i32,
        note: Option<String>,
        product: Option<&Product>,
    ) -> AppResult<Option<CartItem>> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or(AppError::NotFound("cart line"))?;

        if quantity <= 0 {
            self.lines.remove(idx);
            return Ok(None);
        }

        let product = product.ok_or(AppError::NotFound("product"))?;
        let others = self.quantity_for(product.id) - self.lines[idx].quantity;
        within_stock(product, others, quantity)?;

        self.lines[idx].quantity = quantity;
        if let Some(note) = note {
            self.lines[idx].note = normalize(Some(note));
        }

        let (product_id, option, note) = {
            let line = &self.lines[idx];
            (line.product_id, line.selected_option.clone(), line.note.clone())
        };
        let twin = self.lines.iter().enumerate().position(|(i, l)| {
            i != idx && l.same_line(product_id, option.as_deref(), note.as_deref())
        });
        match twin {
            Some(twin) => {
                let merged = self.lines.remove(idx);
                // removal before `twin` shifts it left by one
                let twin = if twin > idx { twin - 1 } else { twin };
                let target = &mut self.lines[twin];
                target.quantity += merged.quantity;
                for attachment in merged.attachments {
                    if !target.attachments.iter().any(|a| a.id == attachment.id) {
                        target.attachments.push(attachment);
                    }
                }
                Ok(Some(target.clone()))
            }
            None => Ok(Some(self.lines[idx].clone())),
        }
    }

    /// Resolves the single line of a product for product-keyed updates.
    pub fn sole_line_for(&self, product_id: Uuid) -> AppResult<Uuid> {
        let mut matching = self.lines.iter().filter(|l| l.product_id == product_id);
        match (matching.next(), matching.next()) {
            (None, _) => Err(AppError::NotFound("cart line")),
            (Some(line), None) => Ok(line.id),
            (Some(_), Some(_)) => Err(AppError::BadRequest(
                "product has several cart lines; update by line id".to_string(),
            )),
        }
    }

    pub fn remove_product(&mut self, product_id: Uuid) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        before - self.lines.len()
    }

    pub fn remove_line(&mut self, line_id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        before != self.lines.len()
    }

    pub fn attach(&mut self, product_id: Uuid, attachment: Attachment) -> AppResult<usize> {
        let mut touched = 0;
        for line in self.lines.iter_mut().filter(|l| l.product_id == product_id) {
            if !line.attachments.iter().any(|a| a.id == attachment.id) {
                line.attachments.push(attachment.clone());
            }
            touched += 1;
        }
        if touched == 0 {
            return Err(AppError::NotFound("cart line"));
        }
        Ok(touched)
    }

    pub fn detach(&mut self, product_id: Uuid, attachment_id: &str) -> AppResult<usize> {
        let mut touched = 0;
        for line in self.lines.iter_mut().filter(|l| l.product_id == product_id) {
            line.attachments.retain(|a| a.id != attachment_id);
            touched += 1;
        }
        if touched == 0 {
            return Err(AppError::NotFound("cart line"));
        }
        Ok(touched)
    }

    /// Sum of `price * quantity`, ignoring lines whose product is gone.
    pub fn total(&self, catalog: &HashMap<Uuid, Product>) -> i64 {
        self.lines
            .iter()
            .filter_map(|l| {
                catalog
                    .get(&l.product_id)
                    .map(|p| p.price * i64::from(l.quantity))
            })
            .sum()
    }

    /// Attachments of all lines, each id once.
    pub fn attachments(&self) -> Vec<Attachment> {
        let mut seen: Vec<Attachment> = Vec::new();
        for attachment in self.lines.iter().flat_map(|l| l.attachments.iter()) {
            if !seen.iter().any(|a| a.id == attachment.id) {
                seen.push(attachment.clone());
            }
        }
        seen
    }
}

pub fn catalog_index(products: Vec<Product>) -> HashMap<Uuid, Product> {
    products.into_iter().map(|p| (p.id, p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32, options: &[&str]) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Stiker Vinyl".into(),
            description: String::new(),
            price: 10_000,
            stock,
            category: "stiker".into(),
            image: String::new(),
            featured: false,
            options: options.iter().map(|o| o.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    fn attachment(id: &str) -> Attachment {
        Attachment {
            id: id.into(),
            name: format!("{id}.png"),
            url: format!("https://files.example/{id}.png"),
        }
    }

    #[test]
    fn same_triple_merges_and_different_note_splits() {
        let p = product(10, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());

        cart.add(&p, 2, None, Some("matte".into())).unwrap();
        cart.add(&p, 3, None, Some("matte".into())).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);

        cart.add(&p, 1, None, Some("glossy".into())).unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.quantity_for(p.id), 6);
    }

    #[test]
    fn stock_ceiling_spans_all_lines_of_a_product() {
        let p = product(5, &["A3", "A4"]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());

        cart.add(&p, 3, Some("A3".into()), None).unwrap();
        let err = cart.add(&p, 3, Some("A4".into()), None).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { requested: 6, .. }));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_for(p.id), 3);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let p = product(5, &["A3"]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        let err = cart.add(&p, 1, Some("A0".into()), None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn blank_note_is_same_line_as_no_note() {
        let p = product(5, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        cart.add(&p, 1, None, None).unwrap();
        cart.add(&p, 1, None, Some("   ".into())).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn update_checks_other_lines_and_removes_at_zero() {
        let p = product(5, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        let a = cart.add(&p, 2, None, Some("a".into())).unwrap();
        let b = cart.add(&p, 1, None, Some("b".into())).unwrap();

        assert!(cart.update_line(a.id, 5, None, Some(&p)).is_err());
        let updated = cart.update_line(a.id, 4, None, Some(&p)).unwrap().unwrap();
        assert_eq!(updated.quantity, 4);

        assert!(cart.update_line(b.id, 0, None, None).unwrap().is_none());
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn oversized_quantity_hits_the_ceiling_instead_of_wrapping() {
        let p = product(5, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        let line = cart.add(&p, 1, None, None).unwrap();
        cart.add(&p, 1, None, Some("x".into())).unwrap();

        let err = cart.add(&p, i32::MAX, None, None).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { requested: i32::MAX, available: 5, .. }
        ));
        let err = cart.update_line(line.id, i32::MAX, None, Some(&p)).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { requested: i32::MAX, .. }));
        assert_eq!(cart.quantity_for(p.id), 2);
    }

    #[test]
    fn attaching_the_same_file_twice_keeps_one_copy() {
        let p = product(10, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        cart.add(&p, 1, None, None).unwrap();
        cart.add(&p, 1, None, Some("x".into())).unwrap();

        assert_eq!(cart.attach(p.id, attachment("f1")).unwrap(), 2);
        assert_eq!(cart.attach(p.id, attachment("f1")).unwrap(), 2);
        assert!(cart.lines().iter().all(|l| l.attachments.len() == 1));
    }

    #[test]
    fn note_change_into_existing_line_merges() {
        let p = product(10, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        let a = cart.add(&p, 2, None, Some("a".into())).unwrap();
        cart.add(&p, 1, None, Some("b".into())).unwrap();
        cart.attach(p.id, attachment("f1")).unwrap();

        let merged = cart
            .update_line(a.id, 2, Some("b".into()), Some(&p))
            .unwrap()
            .unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(merged.quantity, 3);
        assert_eq!(merged.attachments.len(), 1);
    }

    #[test]
    fn sole_line_lookup_refuses_ambiguity() {
        let p = product(10, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        let a = cart.add(&p, 1, None, None).unwrap();
        assert_eq!(cart.sole_line_for(p.id).unwrap(), a.id);

        cart.add(&p, 1, None, Some("x".into())).unwrap();
        assert!(matches!(
            cart.sole_line_for(p.id),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            cart.sole_line_for(Uuid::new_v4()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn total_skips_deleted_products_and_attachments_dedupe() {
        let p = product(10, &[]);
        let gone = product(10, &[]);
        let mut cart = Cart::new(Uuid::new_v4(), Vec::new());
        cart.add(&p, 2, None, None).unwrap();
        cart.add(&p, 1, None, Some("x".into())).unwrap();
        cart.add(&gone, 4, None, None).unwrap();
        cart.attach(p.id, attachment("f1")).unwrap();

        let catalog = catalog_index(vec![p.clone()]);
        assert_eq!(cart.total(&catalog), 30_000);
        assert_eq!(cart.attachments().len(), 1);

        cart.detach(p.id, "f1").unwrap();
        assert!(cart.attachments().is_empty());
        assert_eq!(cart.remove_product(p.id), 2);
        assert!(cart.attach(p.id, attachment("f2")).is_err());
    }
}
