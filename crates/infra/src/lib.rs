//! `tourbook-infra`: storage, repositories and outbound collaborators.
//!
//! Everything that touches the outside world lives here: the document store
//! (in-memory or Postgres), the repositories that enforce cross-document rules
//! on top of it, the mailer, the payment gateway and dev-data seeding.

pub mod error;
pub mod mailer;
pub mod payments;
pub mod repo;
pub mod seed;
pub mod store;

pub use error::RepositoryError;
pub use mailer::{Email, EmailKind, LogMailer, MailError, Mailer, RecordingMailer};
pub use payments::{CheckoutSession, OfflinePaymentGateway, PaymentError, PaymentGateway};
pub use repo::{
    ADMIN_EDITABLE_FIELDS, BOOKING_FIELDS, BookingRepository, CrudRepository, REVIEW_FIELDS,
    ReviewAuthor, ReviewRepository, ReviewView, SELF_EDITABLE_FIELDS, TOUR_FIELDS, TourDetails,
    TourRepository, USER_FIELDS, UserRepository, scoped_to_tour,
};
pub use seed::{SeedReport, import_dir};
pub use store::{
    Collection, Document, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, Revisioned,
    StoreError,
};
