use actix_web::web;

pub mod department;
pub mod employee;
pub mod file;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/v1/employee")
            .route(web::post().to(employee::create_employee))
            .route(web::get().to(employee::get_employees)),
    )
    .service(
        web::resource("/v1/employee/{emp_no}")
            .route(web::get().to(employee::get_employee))
            .route(web::patch().to(employee::update_employee))
            .route(web::delete().to(employee::delete_employee)),
    )
    .service(
        web::resource("/v1/department")
            .route(web::get().to(department::get_departments)),
    )
    .service(
        web::resource("/storage/{key:.*}")
            .route(web::get().to(file::get_photo)),
    );
}
