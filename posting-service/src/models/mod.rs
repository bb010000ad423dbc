//! Data models for the posting engine.

pub mod account;
pub mod inventory;
pub mod invoice;
pub mod journal;
pub mod order;
pub mod posting_group;

pub use account::{Account, AccountClass, AccountDefaults};
pub use inventory::{CostLedgerInsert, Part, PartLedgerInsert, ReceiptLineInsert};
pub use invoice::{InvoiceStatus, LineType, PurchaseInvoice, PurchaseInvoiceLine, Supplier};
pub use journal::{Direction, DocumentRef, DocumentRefKind, JournalLine, JournalLineInsert};
pub use order::{
    derive_order_status, LineCompletion, OrderLineUpdate, OrderStatus, PurchaseOrder,
    PurchaseOrderLine,
};
pub use posting_group::{InventoryPostingGroup, PurchasingPostingGroup};
