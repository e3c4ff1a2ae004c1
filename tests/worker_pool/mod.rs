mod worker_pool_test;
