use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_catalog_tables::Migration),
            Box::new(m20250301_000002_create_reference_tables::Migration),
            Box::new(m20250301_000003_create_cart_items_table::Migration),
            Box::new(m20250301_000004_create_order_tables::Migration),
            Box::new(m20250301_000005_create_backorder_requests_table::Migration),
        ]
    }
}

mod m20250301_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).string())
                        .col(ColumnDef::new(Products::Active).boolean().not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::ProductId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::Price)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::Active)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_variants_product")
                                .from(ProductVariants::Table, ProductVariants::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Promotions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Promotions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Promotions::Name).string().not_null())
                        .col(ColumnDef::new(Promotions::Kind).string().not_null())
                        .col(
                            ColumnDef::new(Promotions::Value)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::StartsAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::EndsAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Promotions::Active).boolean().not_null())
                        .col(
                            ColumnDef::new(Promotions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PromotionVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PromotionVariants::PromotionId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PromotionVariants::VariantId)
                                .integer()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(PromotionVariants::PromotionId)
                                .col(PromotionVariants::VariantId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_promotion_variants_promotion")
                                .from(PromotionVariants::Table, PromotionVariants::PromotionId)
                                .to(Promotions::Table, Promotions::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_promotion_variants_variant")
                                .from(PromotionVariants::Table, PromotionVariants::VariantId)
                                .to(ProductVariants::Table, ProductVariants::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PromotionVariants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Promotions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Description,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductVariants {
        Table,
        Id,
        ProductId,
        Name,
        Price,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Promotions {
        Table,
        Id,
        Name,
        Kind,
        Value,
        StartsAt,
        EndsAt,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PromotionVariants {
        Table,
        PromotionId,
        VariantId,
    }
}

mod m20250301_000002_create_reference_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryZones::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryZones::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DeliveryZones::District).string().not_null())
                        .col(
                            ColumnDef::new(DeliveryZones::Cost)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryZones::EstimatedDays)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryZones::Active).boolean().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentMethods::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentMethods::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PaymentMethods::Name).string().not_null())
                        .col(ColumnDef::new(PaymentMethods::Kind).string().not_null())
                        .col(ColumnDef::new(PaymentMethods::Active).boolean().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(ColumnDef::new(Users::Active).boolean().not_null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SimulatedCards::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SimulatedCards::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SimulatedCards::UserId).uuid().not_null())
                        .col(ColumnDef::new(SimulatedCards::Number).string().not_null())
                        .col(
                            ColumnDef::new(SimulatedCards::HolderName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SimulatedCards::Expiry).string().not_null())
                        .col(ColumnDef::new(SimulatedCards::Cvv).string().not_null())
                        .col(
                            ColumnDef::new(SimulatedCards::Balance)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SimulatedCards::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SimulatedCards::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_simulated_cards_user")
                                .from(SimulatedCards::Table, SimulatedCards::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SimulatedCards::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeliveryZones::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DeliveryZones {
        Table,
        Id,
        District,
        Cost,
        EstimatedDays,
        Active,
    }

    #[derive(DeriveIden)]
    enum PaymentMethods {
        Table,
        Id,
        Name,
        Kind,
        Active,
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Email,
        FullName,
        Role,
        Active,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SimulatedCards {
        Table,
        Id,
        UserId,
        Number,
        HolderName,
        Expiry,
        Cvv,
        Balance,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_cart_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_cart_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CartItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).integer().not_null())
                        .col(ColumnDef::new(CartItems::VariantId).integer().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartItems::PromotionId).integer())
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One row per (user, variant); add_item upserts onto this.
            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_user_variant")
                        .table(CartItems::Table)
                        .col(CartItems::UserId)
                        .col(CartItems::VariantId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        UserId,
        ProductId,
        VariantId,
        Quantity,
        PromotionId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000004_create_order_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Orders::PlacedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(
                            ColumnDef::new(Orders::CustomerSurname)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Address).string())
                        .col(ColumnDef::new(Orders::DeliveryZoneId).integer())
                        .col(ColumnDef::new(Orders::ShippingCost).decimal_len(19, 4))
                        .col(
                            ColumnDef::new(Orders::PaymentMethodId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::CardId).uuid())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::CourierId).uuid())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderLines::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderLines::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderLines::ProductId).integer().not_null())
                        .col(ColumnDef::new(OrderLines::VariantId).integer().not_null())
                        .col(ColumnDef::new(OrderLines::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderLines::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderLines::PromotionPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderLines::Subtotal)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderLines::Status).string().not_null())
                        .col(ColumnDef::new(OrderLines::PromotionId).integer())
                        .col(
                            ColumnDef::new(OrderLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_lines_order")
                                .from(OrderLines::Table, OrderLines::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        PlacedAt,
        CustomerName,
        CustomerSurname,
        Address,
        DeliveryZoneId,
        ShippingCost,
        PaymentMethodId,
        CardId,
        Status,
        CourierId,
        UserId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderLines {
        Table,
        Id,
        OrderId,
        ProductId,
        VariantId,
        Quantity,
        UnitPrice,
        PromotionPrice,
        Subtotal,
        Status,
        PromotionId,
        CreatedAt,
    }
}

mod m20250301_000005_create_backorder_requests_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_backorder_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BackorderRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BackorderRequests::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(BackorderRequests::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(BackorderRequests::VariantId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BackorderRequests::QuantityRequested)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BackorderRequests::Status).string().not_null())
                        .col(
                            ColumnDef::new(BackorderRequests::RequestedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BackorderRequests::ReceivedAt)
                                .timestamp_with_time_zone(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_backorder_requests_order")
                                .from(BackorderRequests::Table, BackorderRequests::OrderId)
                                .to(
                                    super::m20250301_000004_create_order_tables::Orders::Table,
                                    super::m20250301_000004_create_order_tables::Orders::Id,
                                ),
                        )
                        .to_owned(),
                )
                .await?;

            // Duplicate shortage reports for the same (order, variant) are
            // rejected at the schema level as well.
            manager
                .create_index(
                    Index::create()
                        .name("idx_backorder_requests_order_variant")
                        .table(BackorderRequests::Table)
                        .col(BackorderRequests::OrderId)
                        .col(BackorderRequests::VariantId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BackorderRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BackorderRequests {
        Table,
        Id,
        OrderId,
        VariantId,
        QuantityRequested,
        Status,
        RequestedAt,
        ReceivedAt,
    }
}
