//! Domain models and request payloads

pub mod inventory;
pub mod order;
pub mod table;
pub mod till;

pub use inventory::{
    AvailabilityReport, DeductionResult, DeductionSummary, Ingredient, IngredientCreate,
    IngredientUpdate, RecipeLine, RecipeLineInput, Shortfall,
};
pub use order::{Order, OrderCreate, OrderLine, OrderLineInput, OrderStatus, VoidInfo};
pub use table::{Table, TableCreate, TableOccupy, TableStatus};
pub use till::{
    CashSession, ExpenseInput, Movement, MovementKind, PaymentMethod, SaleInput, SessionClose,
    SessionOpen, SessionStatus,
};
